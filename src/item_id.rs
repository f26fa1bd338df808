use std::{num::NonZeroU64, str::FromStr};

use crate::error::{Error, Result};

/// A sequential archive identifier. Ids start at 1 and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(NonZeroU64);

impl ItemId {
    /// Returns `None` for zero, which is never a valid id.
    pub fn new(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Self)
    }

    /// The numeric id used as the key in the index table.
    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// Split a store filename such as `"12.png"` into id and extension.
    ///
    /// The extension is lowercased. Returns `None` for names that are not
    /// `<positive integer>.<ext>`.
    pub fn parse_file_name(name: &str) -> Option<(Self, String)> {
        let (stem, ext) = name.rsplit_once('.')?;
        if ext.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let id = Self::new(stem.parse().ok()?)?;
        Some((id, ext.to_ascii_lowercase()))
    }

    /// File name for this id with the given extension.
    pub fn file_name(self, extension: &str) -> String {
        format!("{}.{}", self.get(), extension)
    }
}

impl FromStr for ItemId {
    type Err = Error;

    /// Accepts user input such as `"12"` or `"#12"`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        digits
            .parse::<u64>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| Error::NotFound {
                kind: "item",
                name: s.to_string(),
            })
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert!(ItemId::new(0).is_none());
        assert_eq!(ItemId::new(7).unwrap().get(), 7);
    }

    #[test]
    fn parses_store_file_names() {
        let (id, ext) = ItemId::parse_file_name("12.PNG").unwrap();
        assert_eq!(id.get(), 12);
        assert_eq!(ext, "png");
    }

    #[test]
    fn rejects_foreign_file_names() {
        assert!(ItemId::parse_file_name("notes.txt").is_none());
        assert!(ItemId::parse_file_name("12").is_none());
        assert!(ItemId::parse_file_name("12.").is_none());
        assert!(ItemId::parse_file_name("0.png").is_none());
        assert!(ItemId::parse_file_name("-3.png").is_none());
        assert!(ItemId::parse_file_name("1.2.png").is_none());
    }

    #[test]
    fn file_name_round_trips() {
        let id = ItemId::new(42).unwrap();
        assert_eq!(id.file_name("jpg"), "42.jpg");
        let (back, ext) = ItemId::parse_file_name(&id.file_name("jpg")).unwrap();
        assert_eq!(back, id);
        assert_eq!(ext, "jpg");
    }

    #[test]
    fn parses_user_input() {
        assert_eq!("5".parse::<ItemId>().unwrap().get(), 5);
        assert_eq!("#5".parse::<ItemId>().unwrap().get(), 5);
        assert!("0".parse::<ItemId>().unwrap_err().is_not_found());
        assert!("five".parse::<ItemId>().is_err());
    }

    #[test]
    fn display_has_hash_prefix() {
        assert_eq!(ItemId::new(9).unwrap().to_string(), "#9");
    }

    #[test]
    fn ordering_follows_numeric_value() {
        let mut ids: Vec<ItemId> =
            [10, 2, 33].into_iter().filter_map(ItemId::new).collect();
        ids.sort();
        let raw: Vec<u64> = ids.iter().map(|i| i.get()).collect();
        assert_eq!(raw, vec![2, 10, 33]);
    }
}
