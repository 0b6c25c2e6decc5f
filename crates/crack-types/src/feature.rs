use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The shape class of a feature under edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryClass {
    Point,
    Multipoint,
    Polyline,
    Polygon,
    Multipatch,
}

impl GeometryClass {
    /// Cracking operates on boundaries; point-like classes carry none.
    pub fn is_crackable(&self) -> bool {
        !matches!(self, GeometryClass::Point | GeometryClass::Multipoint)
    }
}

/// Lightweight reference to a feature in some external store.
///
/// The core never loads features itself; callers hand in geometries keyed by
/// these references and get point sets back keyed the same way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureRef {
    /// Unique identifier of the feature row.
    pub id: Uuid,
    /// Identifier of the feature class (dataset) the feature belongs to.
    pub class_id: u32,
    pub geometry_class: GeometryClass,
}

impl FeatureRef {
    pub fn new(class_id: u32, geometry_class: GeometryClass) -> Self {
        Self {
            id: Uuid::new_v4(),
            class_id,
            geometry_class,
        }
    }

    /// Same row in the same class.
    pub fn same_feature(&self, other: &FeatureRef) -> bool {
        self.id == other.id && self.class_id == other.class_id
    }
}

impl std::fmt::Display for FeatureRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "feature {} (class {})", self.id, self.class_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_classes_not_crackable() {
        assert!(!GeometryClass::Point.is_crackable());
        assert!(!GeometryClass::Multipoint.is_crackable());
        assert!(GeometryClass::Polyline.is_crackable());
        assert!(GeometryClass::Multipatch.is_crackable());
    }

    #[test]
    fn test_feature_refs_usable_as_map_keys() {
        let mut seen = std::collections::HashSet::new();
        let a = FeatureRef::new(1, GeometryClass::Polyline);
        assert!(seen.insert(a.clone()));
        assert!(!seen.insert(a));
        assert!(seen.insert(FeatureRef::new(1, GeometryClass::Multipatch)));
    }

    #[test]
    fn test_same_feature_requires_same_class() {
        let a = FeatureRef::new(1, GeometryClass::Polyline);
        let mut b = a.clone();
        b.class_id = 2;
        assert!(a.same_feature(&a.clone()));
        assert!(!a.same_feature(&b));
    }
}
