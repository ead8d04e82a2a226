//! Placeholder path parsing
//!
//! A placeholder body such as `createUser.items[2].id` becomes a typed
//! sequence of field and index segments.

/// One step of a capture path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object field lookup
    Field(String),
    /// Array element selection
    Index(usize),
}

/// Parse a dotted path with optional bracketed indices
///
/// On a malformed index, returns the raw text of the offending part so the
/// caller can substitute it verbatim.
pub fn parse_path(path: &str) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();

    for part in path.split('.') {
        let (name, mut brackets) = match part.find('[') {
            Some(open) => (&part[..open], &part[open..]),
            None => (part, ""),
        };
        segments.push(Segment::Field(name.to_string()));

        while !brackets.is_empty() {
            let index = brackets
                .strip_prefix('[')
                .and_then(|b| b.find(']').map(|close| (&b[..close], &b[close + 1..])));
            match index {
                Some((digits, tail)) => {
                    let index = digits.trim().parse().map_err(|_| part.to_string())?;
                    segments.push(Segment::Index(index));
                    brackets = tail;
                }
                None => return Err(part.to_string()),
            }
        }
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> Segment {
        Segment::Field(name.to_string())
    }

    #[test]
    fn test_dotted_fields() {
        assert_eq!(
            parse_path("login.token").unwrap(),
            vec![field("login"), field("token")]
        );
        assert_eq!(parse_path("login").unwrap(), vec![field("login")]);
    }

    #[test]
    fn test_indices() {
        assert_eq!(
            parse_path("list.items[2].id").unwrap(),
            vec![field("list"), field("items"), Segment::Index(2), field("id")]
        );
        assert_eq!(
            parse_path("grid[1][0]").unwrap(),
            vec![field("grid"), Segment::Index(1), Segment::Index(0)]
        );
    }

    #[test]
    fn test_malformed_index_returns_part() {
        assert_eq!(parse_path("a.items[x]"), Err("items[x]".to_string()));
        assert_eq!(parse_path("a.items[1"), Err("items[1".to_string()));
        assert_eq!(parse_path("a.items[1]x"), Err("items[1]x".to_string()));
    }
}
