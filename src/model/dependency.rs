use std::fmt;

use crate::{Error, Result};

/// Suffix the editor appends to dependency text typed by the user.
pub const USER_MARKER: &str = "^^user^^";

/// How a row's dates follow its target row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// Start a number of working days after the target ends.
    After,
    /// Start on the same day as the target.
    SameAs,
}

impl DependencyKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            DependencyKind::After => "after",
            DependencyKind::SameAs => "sameas",
        }
    }
}

/// Which row a dependency points at, as written in the rule text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRef {
    /// Signed number of chart rows away from the dependent row.
    Relative(i32),
    /// 1-based row number.
    Absolute(u32),
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::Relative(n) if *n >= 0 => write!(f, "+{}", n),
            TargetRef::Relative(n) => write!(f, "{}", n),
            TargetRef::Absolute(no) => write!(f, "{}", no),
        }
    }
}

/// A parsed dependency rule, e.g. `after,-1,2` or `sameas,5`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub kind: DependencyKind,
    pub target: TargetRef,
    /// Day offset as written; `None` when omitted or not a number.
    pub offset: Option<i64>,
    /// Typed by the user and not yet linked to a row id.
    pub user_entered: bool,
}

impl Dependency {
    pub fn new(kind: DependencyKind, target: TargetRef, offset: Option<i64>) -> Self {
        Self {
            kind,
            target,
            offset,
            user_entered: false,
        }
    }

    /// Parse rule text.
    ///
    /// Returns `Ok(None)` for empty or malformed text (the rule is dropped the
    /// same way a dangling reference is) and an error for an unknown rule type.
    pub fn parse(text: &str) -> Result<Option<Self>> {
        let mut body = text.trim();
        let mut user_entered = false;
        if let Some(stripped) = body.strip_suffix(USER_MARKER) {
            body = stripped.trim_end();
            user_entered = true;
        }
        if body.is_empty() {
            return Ok(None);
        }

        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        let kind = match parts[0].to_ascii_lowercase().as_str() {
            "after" => DependencyKind::After,
            "sameas" => DependencyKind::SameAs,
            other => return Err(Error::UnsupportedDependencyType(other.to_string())),
        };

        let target = match parts.get(1).and_then(|r| parse_target(r)) {
            Some(t) => t,
            None => {
                tracing::debug!("dropping dependency with unreadable target: {:?}", text);
                return Ok(None);
            }
        };
        let offset = parts.get(2).and_then(|o| o.parse::<i64>().ok());

        Ok(Some(Self {
            kind,
            target,
            offset,
            user_entered,
        }))
    }

    /// The day offset used for scheduling; `after` defaults to one day.
    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(1)
    }
}

fn parse_target(raw: &str) -> Option<TargetRef> {
    if raw.starts_with('+') || raw.starts_with('-') {
        raw.parse::<i32>().ok().map(TargetRef::Relative)
    } else {
        match raw.parse::<u32>() {
            Ok(no) if no > 0 => Some(TargetRef::Absolute(no)),
            _ => None,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.kind.keyword(), self.target)?;
        if let Some(offset) = self.offset {
            write!(f, ",{}", offset)?;
        }
        if self.user_entered {
            f.write_str(USER_MARKER)?;
        }
        Ok(())
    }
}

/// Serde helper storing `Option<Dependency>` as its rule text (`""` for none).
pub mod dependency_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};

    use super::Dependency;

    pub fn serialize<S>(dep: &Option<Dependency>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match dep {
            Some(d) => serializer.collect_str(d),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Dependency>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(text) => Dependency::parse(&text).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_after_with_offset() {
        let dep = Dependency::parse("after,-1,1").unwrap().unwrap();
        assert_eq!(dep.kind, DependencyKind::After);
        assert_eq!(dep.target, TargetRef::Relative(-1));
        assert_eq!(dep.offset, Some(1));
        assert!(!dep.user_entered);
        assert_eq!(dep.to_string(), "after,-1,1");
    }

    #[test]
    fn test_parse_sameas_absolute() {
        let dep = Dependency::parse("sameas,5").unwrap().unwrap();
        assert_eq!(dep.kind, DependencyKind::SameAs);
        assert_eq!(dep.target, TargetRef::Absolute(5));
        assert_eq!(dep.offset, None);
        assert_eq!(dep.to_string(), "sameas,5");
    }

    #[test]
    fn test_parse_user_marker() {
        let dep = Dependency::parse("after,+2,3^^user^^").unwrap().unwrap();
        assert!(dep.user_entered);
        assert_eq!(dep.target, TargetRef::Relative(2));
        assert_eq!(dep.to_string(), "after,+2,3^^user^^");
    }

    #[test]
    fn test_offset_defaults_to_one() {
        let dep = Dependency::parse("after,-1,abc").unwrap().unwrap();
        assert_eq!(dep.offset, None);
        assert_eq!(dep.effective_offset(), 1);

        let dep = Dependency::parse("after,-1,-3").unwrap().unwrap();
        assert_eq!(dep.effective_offset(), -3);
    }

    #[test]
    fn test_parse_is_case_insensitive_on_type() {
        let dep = Dependency::parse(" SameAs , -2 ").unwrap().unwrap();
        assert_eq!(dep.kind, DependencyKind::SameAs);
        assert_eq!(dep.target, TargetRef::Relative(-2));
    }

    #[test]
    fn test_empty_and_malformed_are_none() {
        assert_eq!(Dependency::parse("").unwrap(), None);
        assert_eq!(Dependency::parse("   ").unwrap(), None);
        assert_eq!(Dependency::parse("^^user^^").unwrap(), None);
        assert_eq!(Dependency::parse("after").unwrap(), None);
        assert_eq!(Dependency::parse("after,x").unwrap(), None);
        assert_eq!(Dependency::parse("after,0").unwrap(), None);
    }

    #[test]
    fn test_unsupported_type_is_error() {
        let err = Dependency::parse("before,-1").unwrap_err();
        assert!(matches!(err, Error::UnsupportedDependencyType(t) if t == "before"));
    }

    #[test]
    fn test_serde_round_trip_text() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Holder {
            #[serde(with = "dependency_serde", default)]
            dependency: Option<Dependency>,
        }

        let json = r#"{"dependency":"sameas,+3,2"}"#;
        let holder: Holder = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_string(&holder).unwrap(), json);

        let empty: Holder = serde_json::from_str(r#"{"dependency":""}"#).unwrap();
        assert!(empty.dependency.is_none());

        assert!(serde_json::from_str::<Holder>(r#"{"dependency":"during,1"}"#).is_err());
    }
}
