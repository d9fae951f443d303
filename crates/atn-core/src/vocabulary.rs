// Vocabulary: token type -> literal / symbolic / display names.

use std::collections::HashMap;

use crate::interval::IntervalSet;
use crate::token::EOF;

/// Error returned when a `.tokens` listing cannot be parsed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VocabularyError {
    #[error("line {line}: expected `NAME=TYPE`, got {text:?}")]
    MalformedLine { line: usize, text: String },
    #[error("line {line}: invalid token type {text:?}")]
    InvalidTokenType { line: usize, text: String },
    #[error("line {line}: token type {token_type} is reserved")]
    ReservedTokenType { line: usize, token_type: i32 },
}

/// Names of the terminal symbols of one grammar. Read-only once built.
///
/// Literal names keep their quotes (`'+'`), symbolic names are bare
/// identifiers (`PLUS`). Index 0 is the invalid token type and normally has
/// no name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vocabulary {
    literal_names: Vec<Option<String>>,
    symbolic_names: Vec<Option<String>>,
}

impl Vocabulary {
    pub fn new(literal_names: Vec<Option<String>>, symbolic_names: Vec<Option<String>>) -> Self {
        Self {
            literal_names,
            symbolic_names,
        }
    }

    /// Highest token type that has any name.
    pub fn max_token_type(&self) -> i32 {
        self.literal_names.len().max(self.symbolic_names.len()) as i32 - 1
    }

    pub fn literal_name(&self, token_type: i32) -> Option<&str> {
        usize::try_from(token_type)
            .ok()
            .and_then(|t| self.literal_names.get(t))
            .and_then(|n| n.as_deref())
    }

    pub fn symbolic_name(&self, token_type: i32) -> Option<&str> {
        if token_type == EOF {
            return Some("EOF");
        }
        usize::try_from(token_type)
            .ok()
            .and_then(|t| self.symbolic_names.get(t))
            .and_then(|n| n.as_deref())
    }

    /// Name for diagnostics: literal, then symbolic, then the number itself.
    pub fn display_name(&self, token_type: i32) -> String {
        if token_type == EOF {
            return "<EOF>".to_string();
        }
        if let Some(lit) = self.literal_name(token_type) {
            return lit.to_string();
        }
        if let Some(sym) = self.symbolic_name(token_type) {
            return sym.to_string();
        }
        token_type.to_string()
    }

    /// Reverse lookup by symbolic or literal name.
    pub fn token_type(&self, name: &str) -> Option<i32> {
        if name == "EOF" {
            return Some(EOF);
        }
        let find = |names: &[Option<String>]| {
            names
                .iter()
                .position(|n| n.as_deref() == Some(name))
                .map(|i| i as i32)
        };
        find(&self.symbolic_names).or_else(|| find(&self.literal_names))
    }

    pub fn literal_names(&self) -> &[Option<String>] {
        &self.literal_names
    }

    pub fn symbolic_names(&self) -> &[Option<String>] {
        &self.symbolic_names
    }

    /// Render a token set with display names, e.g. `{'(', IDENT}`.
    pub fn format_set(&self, set: &IntervalSet) -> String {
        set.to_string_with(|t| self.display_name(t))
    }

    /// Parse a `.tokens` listing: one `NAME=TYPE` or `'literal'=TYPE` per line.
    ///
    /// Blank lines are ignored. The same type may appear once with a symbolic
    /// name and once with a literal.
    pub fn from_tokens_file(text: &str) -> Result<Self, VocabularyError> {
        let mut literals: HashMap<i32, String> = HashMap::new();
        let mut symbols: HashMap<i32, String> = HashMap::new();
        let mut max_type = 0;

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let Some(eq) = trimmed.rfind('=') else {
                return Err(VocabularyError::MalformedLine {
                    line,
                    text: trimmed.to_string(),
                });
            };
            let (name, ty) = (&trimmed[..eq], &trimmed[eq + 1..]);
            if name.is_empty() {
                return Err(VocabularyError::MalformedLine {
                    line,
                    text: trimmed.to_string(),
                });
            }
            let token_type: i32 = ty.parse().map_err(|_| VocabularyError::InvalidTokenType {
                line,
                text: ty.to_string(),
            })?;
            if token_type < 1 {
                return Err(VocabularyError::ReservedTokenType { line, token_type });
            }
            max_type = max_type.max(token_type);
            if name.starts_with('\'') {
                literals.insert(token_type, name.to_string());
            } else {
                symbols.insert(token_type, name.to_string());
            }
        }

        let len = max_type as usize + 1;
        let mut literal_names = vec![None; len];
        let mut symbolic_names = vec![None; len];
        for (t, n) in literals {
            literal_names[t as usize] = Some(n);
        }
        for (t, n) in symbols {
            symbolic_names[t as usize] = Some(n);
        }
        Ok(Self::new(literal_names, symbolic_names))
    }

    /// Inverse of [`from_tokens_file`](Self::from_tokens_file), ordered by type.
    pub fn to_tokens_file(&self) -> String {
        let mut out = String::new();
        for t in 1..=self.max_token_type() {
            if let Some(sym) = self.symbolic_name(t) {
                out.push_str(&format!("{sym}={t}\n"));
            }
            if let Some(lit) = self.literal_name(t) {
                out.push_str(&format!("{lit}={t}\n"));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vocabulary {
        Vocabulary::new(
            vec![None, Some("'('".into()), None],
            vec![None, Some("LPAREN".into()), Some("IDENT".into())],
        )
    }

    #[test]
    fn display_name_prefers_literal() {
        let v = sample();
        assert_eq!(v.display_name(1), "'('");
        assert_eq!(v.display_name(2), "IDENT");
        assert_eq!(v.display_name(9), "9");
        assert_eq!(v.display_name(EOF), "<EOF>");
    }

    #[test]
    fn reverse_lookup() {
        let v = sample();
        assert_eq!(v.token_type("IDENT"), Some(2));
        assert_eq!(v.token_type("'('"), Some(1));
        assert_eq!(v.token_type("LPAREN"), Some(1));
        assert_eq!(v.token_type("EOF"), Some(EOF));
        assert_eq!(v.token_type("nope"), None);
    }

    #[test]
    fn max_token_type() {
        assert_eq!(sample().max_token_type(), 2);
        assert_eq!(Vocabulary::default().max_token_type(), -1);
    }

    #[test]
    fn format_set_uses_names() {
        let v = sample();
        let set = IntervalSet::of_range(1, 2);
        assert_eq!(v.format_set(&set), "{'(', IDENT}");
    }

    #[test]
    fn tokens_file_round_trip() {
        let text = "LPAREN=1\n'('=1\nIDENT=2\n\n'='=3\n";
        let v = Vocabulary::from_tokens_file(text).unwrap();
        assert_eq!(v.symbolic_name(1), Some("LPAREN"));
        assert_eq!(v.literal_name(1), Some("'('"));
        assert_eq!(v.literal_name(3), Some("'='"));
        assert_eq!(v.symbolic_name(3), None);
        let again = Vocabulary::from_tokens_file(&v.to_tokens_file()).unwrap();
        assert_eq!(again, v);
    }

    #[test]
    fn literal_containing_equals_sign() {
        let v = Vocabulary::from_tokens_file("'=='=4\n").unwrap();
        assert_eq!(v.literal_name(4), Some("'=='"));
    }

    #[test]
    fn tokens_file_errors() {
        assert!(matches!(
            Vocabulary::from_tokens_file("JUNK"),
            Err(VocabularyError::MalformedLine { line: 1, .. })
        ));
        assert!(matches!(
            Vocabulary::from_tokens_file("A=1\nB=x"),
            Err(VocabularyError::InvalidTokenType { line: 2, .. })
        ));
        assert!(matches!(
            Vocabulary::from_tokens_file("A=0"),
            Err(VocabularyError::ReservedTokenType { token_type: 0, .. })
        ));
    }
}
