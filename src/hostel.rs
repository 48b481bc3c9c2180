/// Hostel blocks on campus. Listings and profiles only accept these.
pub const HOSTEL_BLOCKS: [&str; 18] = [
    "A Block", "B Block", "C Block", "D Block", "E Block", "F Block", "G Block", "H Block",
    "J Block", "K Block", "L Block", "M Block", "N Block", "P Block", "Q Block", "R Block",
    "S Block", "T Block",
];

pub const HOSTEL_TYPES: [&str; 2] = ["Male", "Female"];

pub fn is_valid_block(block: &str) -> bool {
    HOSTEL_BLOCKS.contains(&block)
}

pub fn is_valid_type(hostel_type: &str) -> bool {
    HOSTEL_TYPES.contains(&hostel_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_blocks_are_accepted() {
        assert!(is_valid_block("A Block"));
        assert!(is_valid_block("T Block"));
        assert!(!is_valid_block("I Block"));
        assert!(!is_valid_block("Z Block"));
        assert!(!is_valid_block("A"));
    }

    #[test]
    fn hostel_types_are_male_or_female() {
        assert!(is_valid_type("Male"));
        assert!(is_valid_type("Female"));
        assert!(!is_valid_type("male"));
        assert!(!is_valid_type(""));
    }
}
