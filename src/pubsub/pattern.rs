use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
    sync::Arc,
};

use herald_error::PubSubError;
use regex::Regex;

/// Шаблон канала: скомпилированное регулярное выражение.
///
/// Идентичность шаблона определяется его исходным текстом ([`Pattern::key`]):
/// два независимо созданных `Pattern` с одинаковым источником считаются одной
/// и той же подпиской. Флаги задаются только внутри выражения
/// (`(?i)news\..*`), поэтому всегда входят в ключ. Готовый `Regex` не
/// принимается: флаги `RegexBuilder` не видны в его тексте.
///
/// Сопоставление не заякорено: `news` совпадает с `breaking.news.eu`. Для
/// полного совпадения используйте `^...$`.
#[derive(Clone)]
pub struct Pattern {
    regex: Arc<Regex>,
}

impl Pattern {
    /// Компилирует шаблон из строки.
    pub fn new(source: &str) -> Result<Self, PubSubError> {
        let regex = Regex::new(source).map_err(|e| PubSubError::InvalidPattern {
            pattern: source.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            regex: Arc::new(regex),
        })
    }

    /// Канонический текст шаблона, ключ дедупликации подписок.
    pub fn key(&self) -> &str {
        self.regex.as_str()
    }

    /// Проверяет, совпадает ли канал с шаблоном.
    #[inline]
    pub fn is_match(&self, channel: &str) -> bool {
        self.regex.is_match(channel)
    }

    pub fn as_regex(&self) -> &Regex {
        &self.regex
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.key()).finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.key())
    }
}

impl FromStr for Pattern {
    type Err = PubSubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Приведение аргументов `psubscribe`/`punsubscribe` к [`Pattern`].
///
/// Готовые `Pattern` используются как есть, строки компилируются.
pub trait IntoPattern {
    fn into_pattern(self) -> Result<Pattern, PubSubError>;
}

impl IntoPattern for Pattern {
    fn into_pattern(self) -> Result<Pattern, PubSubError> {
        Ok(self)
    }
}

impl IntoPattern for &Pattern {
    fn into_pattern(self) -> Result<Pattern, PubSubError> {
        Ok(self.clone())
    }
}

impl IntoPattern for &str {
    fn into_pattern(self) -> Result<Pattern, PubSubError> {
        Pattern::new(self)
    }
}

impl IntoPattern for String {
    fn into_pattern(self) -> Result<Pattern, PubSubError> {
        Pattern::new(&self)
    }
}

impl IntoPattern for &String {
    fn into_pattern(self) -> Result<Pattern, PubSubError> {
        Pattern::new(self)
    }
}
