use std::fmt;

use super::model_name::ModelName;

/// Association from one model to another.
///
/// `Model` holds a single foreign record (an id, or the embedded object when
/// populated). `Collection` holds many.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Relation {
    Model(ModelName),
    Collection(ModelName),
}

impl Relation {
    pub fn target(&self) -> &ModelName {
        match self {
            Self::Model(t) | Self::Collection(t) => t,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_))
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(t) => write!(f, "-> {t}"),
            Self::Collection(t) => write!(f, "-> {t}[]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_and_cardinality() {
        let users = ModelName::new("users").unwrap();
        let r = Relation::Collection(users.clone());
        assert_eq!(r.target(), &users);
        assert!(r.is_collection());
        assert_eq!(r.to_string(), "-> users[]");
        assert!(!Relation::Model(users).is_collection());
    }
}
