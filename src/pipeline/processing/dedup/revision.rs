use std::fmt;

/// Rank of a revision token.
///
/// Grammar: the token is trimmed and a leading `.` is added when absent.
/// The rank is the first `.` immediately followed by one or two ASCII digits,
/// read as an integer (`.10` -> 10, `01` -> 1, `.00` -> 0, `.123` -> 12).
/// A token with no such match ranks 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Revision(u8);

impl Revision {
    pub fn parse(token: &str) -> Self {
        let trimmed = token.trim();
        let dotted;
        let s = if trimmed.starts_with('.') {
            trimmed
        } else {
            dotted = format!(".{}", trimmed);
            dotted.as_str()
        };

        let bytes = s.as_bytes();
        for (i, b) in bytes.iter().enumerate() {
            if *b != b'.' {
                continue;
            }
            let digits: Vec<u8> = bytes[i + 1..]
                .iter()
                .take(2)
                .take_while(|c| c.is_ascii_digit())
                .map(|c| c - b'0')
                .collect();
            if !digits.is_empty() {
                return Revision(digits.iter().fold(0, |acc, d| acc * 10 + d));
            }
        }
        Revision(0)
    }

    pub fn rank(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks() {
        assert_eq!(Revision::parse(".10").rank(), 10);
        assert_eq!(Revision::parse("01").rank(), 1);
        assert_eq!(Revision::parse(".00").rank(), 0);
        assert_eq!(Revision::parse(" .02 ").rank(), 2);
        assert_eq!(Revision::parse("7").rank(), 7);
        assert_eq!(Revision::parse(".123").rank(), 12);
    }

    #[test]
    fn test_first_dot_with_digits_wins() {
        assert_eq!(Revision::parse("1.5").rank(), 1);
        assert_eq!(Revision::parse("a.3").rank(), 3);
    }

    #[test]
    fn test_malformed_is_zero() {
        assert_eq!(Revision::parse("").rank(), 0);
        assert_eq!(Revision::parse("rev").rank(), 0);
        assert_eq!(Revision::parse("..").rank(), 0);
    }

    #[test]
    fn test_ordering_follows_rank() {
        assert!(Revision::parse(".10") > Revision::parse("01"));
        assert_eq!(Revision::parse("01"), Revision::parse(".01"));
        assert_eq!(Revision::parse("junk"), Revision::parse(".00"));
        assert!(Revision::parse("n/a") < Revision::parse("01"));
    }
}
