use std::collections::HashMap;

/// Lookup table from lower-cased contact name to an E.164 phone
/// number, built from the contact sheet once per run.
#[derive(Debug, Default)]
pub struct PhoneDirectory {
    entries: HashMap<String, String>,
}

impl PhoneDirectory {
    /// Build the directory from two-column (name, raw phone) rows.
    /// Rows with fewer than two columns or an unusable phone number
    /// are dropped without complaint.
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let mut entries = HashMap::new();
        for row in rows {
            let (Some(name), Some(raw_phone)) = (row.first(), row.get(1)) else {
                continue;
            };
            let key = name.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            if let Some(phone) = to_phone_number(raw_phone) {
                entries.insert(key, phone);
            }
        }
        Self { entries }
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.trim().to_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Normalize free-form phone text to `+1XXXXXXXXXX`. Accepts 10-digit
/// numbers and 11-digit numbers with a leading 1; anything else is
/// rejected.
pub fn to_phone_number(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        10 => Some(format!("+1{}", digits)),
        11 if digits.starts_with('1') => Some(format!("+{}", digits)),
        _ => None,
    }
}
