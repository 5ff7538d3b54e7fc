//! Guest key sequences, expressed as QEMU `sendkey` identifiers.

use std::fmt;

/// A single QEMU key identifier, e.g. `h`, `ret`, `shift-a`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(String);

impl Key {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Maps one printable ASCII character to the key that types it on a US layout.
    pub fn for_char(ch: char) -> Result<Self, KeyError> {
        let id = match ch {
            'a'..='z' | '0'..='9' => ch.to_string(),
            'A'..='Z' => format!("shift-{}", ch.to_ascii_lowercase()),
            ' ' => "spc".to_string(),
            _ => match punctuation(ch) {
                Some((id, false)) => id.to_string(),
                Some((id, true)) => format!("shift-{id}"),
                None => return Err(KeyError::Unsupported(ch)),
            },
        };
        Ok(Self(id))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns the qcode for a punctuation character and whether shift must be held.
fn punctuation(ch: char) -> Option<(&'static str, bool)> {
    let key = match ch {
        '-' => ("minus", false),
        '=' => ("equal", false),
        '[' => ("bracket_left", false),
        ']' => ("bracket_right", false),
        '\\' => ("backslash", false),
        ';' => ("semicolon", false),
        '\'' => ("apostrophe", false),
        '`' => ("grave_accent", false),
        ',' => ("comma", false),
        '.' => ("dot", false),
        '/' => ("slash", false),
        '!' => ("1", true),
        '@' => ("2", true),
        '#' => ("3", true),
        '$' => ("4", true),
        '%' => ("5", true),
        '^' => ("6", true),
        '&' => ("7", true),
        '*' => ("8", true),
        '(' => ("9", true),
        ')' => ("0", true),
        '_' => ("minus", true),
        '+' => ("equal", true),
        '{' => ("bracket_left", true),
        '}' => ("bracket_right", true),
        '|' => ("backslash", true),
        ':' => ("semicolon", true),
        '"' => ("apostrophe", true),
        '~' => ("grave_accent", true),
        '<' => ("comma", true),
        '>' => ("dot", true),
        '?' => ("slash", true),
        _ => return None,
    };
    Some(key)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("no key identifier for character {0:?}")]
    Unsupported(char),
}

/// An ordered, immutable sequence of key presses making up one line of guest input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySequence {
    keys: Vec<Key>,
}

impl KeySequence {
    pub fn new(keys: Vec<Key>) -> Self {
        Self { keys }
    }

    /// Encodes `line` as key presses followed by `ret`.
    pub fn for_command(line: &str) -> Result<Self, KeyError> {
        let mut keys = line.chars().map(Key::for_char).collect::<Result<Vec<_>, _>>()?;
        keys.push(Key::new("ret"));
        Ok(Self { keys })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for KeySequence {
    /// The `help` command.
    fn default() -> Self {
        Self::new(["h", "e", "l", "p", "ret"].into_iter().map(Key::new).collect())
    }
}

impl<'a> IntoIterator for &'a KeySequence {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}
