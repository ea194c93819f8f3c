//! Word splitting and case conversion for derived names.

/// An identifier split into words.
///
/// Splitting discards runs of non-alphanumeric characters and breaks at
/// lower-to-upper case changes (`fooBar`) and before an upper/lower pair
/// following other letters (`XMLParser` becomes `XML`, `Parser`). A word that
/// starts with a digit is prefixed with `_`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Words(Vec<String>);

impl Words {
    /// Splits `text` into words.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut words = Vec::new();
        let mut current = String::new();
        for (i, &c) in chars.iter().enumerate() {
            if !c.is_alphanumeric() {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
                continue;
            }
            if let Some(&prev) = i.checked_sub(1).and_then(|p| chars.get(p)) {
                let next = chars.get(i + 1).copied();
                let case_change =
                    (prev.is_lowercase() || prev.is_ascii_digit()) && c.is_uppercase();
                let acronym_end = prev.is_alphanumeric()
                    && c.is_uppercase()
                    && next.is_some_and(char::is_lowercase);
                if (case_change || acronym_end) && !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            current.push(c);
        }
        if !current.is_empty() {
            words.push(current);
        }
        Self(
            words
                .into_iter()
                .map(|w| {
                    if w.starts_with(|c: char| !c.is_alphabetic() && c != '_') {
                        format!("_{w}")
                    } else {
                        w
                    }
                })
                .collect(),
        )
    }

    /// Wraps already-split words.
    #[must_use]
    pub fn from_words(words: Vec<String>) -> Self {
        Self(words)
    }

    /// The words as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// True if there are no words.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends the words of `other`.
    #[must_use]
    pub fn join_with(mut self, other: Words) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Each word with an upper-case initial and the rest lower case.
    #[must_use]
    pub fn titlewords(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|w| map_initial(w, |c| c.to_uppercase().collect(), str::to_lowercase))
            .collect()
    }

    /// Title-cased words joined with nothing: `CompanyName`.
    #[must_use]
    pub fn titlecase(&self) -> String {
        self.titlewords().concat()
    }

    /// Each word with an upper-case initial, the rest unchanged.
    #[must_use]
    pub fn capwords(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|w| map_initial(w, |c| c.to_uppercase().collect(), str::to_owned))
            .collect()
    }

    /// Capitalised words joined with nothing: `XMLParser`.
    #[must_use]
    pub fn capcase(&self) -> String {
        self.capwords().concat()
    }

    /// Camel case: `companyName`.
    #[must_use]
    pub fn camelcase(&self) -> String {
        self.0
            .iter()
            .enumerate()
            .map(|(i, w)| {
                if i == 0 {
                    w.to_lowercase()
                } else {
                    map_initial(w, |c| c.to_uppercase().collect(), str::to_lowercase)
                }
            })
            .collect()
    }

    /// Lower-case words joined by `_`: `company_name`.
    #[must_use]
    pub fn snakecase(&self) -> String {
        self.0
            .iter()
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Upper-case words joined by `_`: `COMPANY_NAME`.
    #[must_use]
    pub fn shoutcase(&self) -> String {
        self.0
            .iter()
            .map(|w| w.to_uppercase())
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl std::fmt::Display for Words {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.titlecase())
    }
}

fn map_initial(word: &str, initial: impl Fn(char) -> String, rest: impl Fn(&str) -> String) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => initial(c) + &rest(chars.as_str()),
        None => String::new(),
    }
}

/// Removes immediately repeated runs from `items`.
///
/// Whenever the run starting at some element recurs straight after itself,
/// the repeat is dropped, so `[Company, Company, Name]` becomes
/// `[Company, Name]` and `[A, B, A, B, C]` becomes `[A, B, C]`.
pub fn elide_repeated_subsequences<T>(items: &mut Vec<T>, same: impl Fn(&T, &T) -> bool) {
    let mut i = 0;
    while i < items.len() {
        let mut j = i;
        while j + 1 < items.len() {
            let Some(k) = items[j + 1..].iter().position(|e| same(e, &items[i])) else {
                break;
            };
            let length = j + 1 + k - i;
            let start = j + k + 1;
            let repeats = start + length <= items.len()
                && (0..length).all(|n| same(&items[i + n], &items[start + n]));
            if repeats {
                items.drain(start..start + length);
                j = i;
            } else {
                j += k + 1;
            }
        }
        i += 1;
    }
}
