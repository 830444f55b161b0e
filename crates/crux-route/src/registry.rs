//! Indexed, filtered hold collection built from raw detector output.

use kiddo::KdTree;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// One detector box. `(x, y)` is the box center in image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub class_id: u32,
    pub confidence: f32,
}

/// Which limbs may use a hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldRole {
    #[default]
    Any,
    Hand,
    Foot,
}

impl HoldRole {
    #[inline]
    pub fn allows_hand(self) -> bool {
        matches!(self, HoldRole::Any | HoldRole::Hand)
    }

    #[inline]
    pub fn allows_foot(self) -> bool {
        matches!(self, HoldRole::Any | HoldRole::Foot)
    }
}

/// Detection filtering and class-to-role mapping.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldFilter {
    /// Detections below this confidence are dropped.
    pub min_confidence: f32,
    /// When set, only these classes are kept.
    pub allowed_classes: Option<Vec<u32>>,
    /// Classes usable by hands; empty means every class.
    pub hand_classes: Vec<u32>,
    /// Classes usable by feet; empty means every class.
    pub foot_classes: Vec<u32>,
}

impl HoldFilter {
    /// Role of a class. A class listed for neither limb kind, while both
    /// lists are configured, stays usable by both.
    pub fn role_for(&self, class_id: u32) -> HoldRole {
        let hand = self.hand_classes.is_empty() || self.hand_classes.contains(&class_id);
        let foot = self.foot_classes.is_empty() || self.foot_classes.contains(&class_id);
        match (hand, foot) {
            (true, false) => HoldRole::Hand,
            (false, true) => HoldRole::Foot,
            _ => HoldRole::Any,
        }
    }

    fn keeps(&self, det: &RawDetection) -> bool {
        if det.confidence < self.min_confidence {
            return false;
        }
        self.allowed_classes
            .as_ref()
            .is_none_or(|classes| classes.contains(&det.class_id))
    }
}

/// A registered hold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hold {
    /// Index in the registry.
    pub id: usize,
    pub center: Point2<f32>,
    pub width: f32,
    pub height: f32,
    pub class_id: u32,
    pub confidence: f32,
    pub role: HoldRole,
}

/// Immutable set of holds; ids follow insertion order after filtering.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HoldRegistry {
    holds: Vec<Hold>,
    #[serde(skip)]
    malformed: usize,
}

impl HoldRegistry {
    pub fn from_detections(detections: &[RawDetection], filter: &HoldFilter) -> Self {
        let mut holds = Vec::with_capacity(detections.len());
        let mut malformed = 0usize;
        let mut filtered = 0usize;

        for det in detections {
            if !is_well_formed(det) {
                log::warn!("dropping malformed detection {det:?}");
                malformed += 1;
                continue;
            }
            if !filter.keeps(det) {
                filtered += 1;
                continue;
            }
            holds.push(Hold {
                id: holds.len(),
                center: Point2::new(det.x, det.y),
                width: det.width,
                height: det.height,
                class_id: det.class_id,
                confidence: det.confidence,
                role: filter.role_for(det.class_id),
            });
        }

        log::debug!(
            "registered {} holds ({filtered} filtered, {malformed} malformed)",
            holds.len()
        );
        Self { holds, malformed }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.holds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.holds.is_empty()
    }

    #[inline]
    pub fn get(&self, id: usize) -> Option<&Hold> {
        self.holds.get(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hold> {
        self.holds.iter()
    }

    #[inline]
    pub fn holds(&self) -> &[Hold] {
        &self.holds
    }

    /// Number of detections rejected for non-finite or negative geometry.
    #[inline]
    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    /// 2-D index over hold centers; items are hold ids.
    pub(crate) fn spatial_index(&self) -> KdTree<f32, 2> {
        let mut tree: KdTree<f32, 2> = KdTree::new();
        for hold in &self.holds {
            tree.add(&[hold.center.x, hold.center.y], hold.id as u64);
        }
        tree
    }
}

impl<'a> IntoIterator for &'a HoldRegistry {
    type Item = &'a Hold;
    type IntoIter = std::slice::Iter<'a, Hold>;

    fn into_iter(self) -> Self::IntoIter {
        self.holds.iter()
    }
}

fn is_well_formed(det: &RawDetection) -> bool {
    [det.x, det.y, det.width, det.height, det.confidence]
        .iter()
        .all(|v| v.is_finite())
        && det.width >= 0.0
        && det.height >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, y: f32, class_id: u32, confidence: f32) -> RawDetection {
        RawDetection {
            x,
            y,
            width: 20.0,
            height: 15.0,
            class_id,
            confidence,
        }
    }

    #[test]
    fn ids_follow_insertion_order_after_filtering() {
        let dets = [
            det(10.0, 10.0, 0, 0.9),
            det(20.0, 20.0, 0, 0.2),
            det(30.0, 30.0, 1, 0.8),
            det(40.0, 40.0, 2, 0.95),
        ];
        let filter = HoldFilter {
            min_confidence: 0.5,
            allowed_classes: Some(vec![0, 1]),
            ..HoldFilter::default()
        };
        let reg = HoldRegistry::from_detections(&dets, &filter);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(0).map(|h| h.center.x), Some(10.0));
        assert_eq!(reg.get(1).map(|h| h.center.x), Some(30.0));
        assert!(reg.iter().enumerate().all(|(i, h)| h.id == i));
    }

    #[test]
    fn malformed_detections_are_dropped() {
        let dets = [
            det(f32::NAN, 10.0, 0, 0.9),
            det(10.0, f32::INFINITY, 0, 0.9),
            RawDetection {
                width: -3.0,
                ..det(1.0, 1.0, 0, 0.9)
            },
            det(5.0, 5.0, 0, 0.9),
        ];
        let reg = HoldRegistry::from_detections(&dets, &HoldFilter::default());
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.malformed_count(), 3);
    }

    #[test]
    fn roles_follow_class_lists() {
        let filter = HoldFilter {
            hand_classes: vec![1],
            foot_classes: vec![2],
            ..HoldFilter::default()
        };
        assert_eq!(filter.role_for(1), HoldRole::Hand);
        assert_eq!(filter.role_for(2), HoldRole::Foot);
        assert_eq!(filter.role_for(3), HoldRole::Any);
        assert_eq!(HoldFilter::default().role_for(7), HoldRole::Any);

        let hands_only = HoldFilter {
            hand_classes: vec![1],
            ..HoldFilter::default()
        };
        assert_eq!(hands_only.role_for(1), HoldRole::Any);
        assert_eq!(hands_only.role_for(4), HoldRole::Foot);
    }

    #[test]
    fn empty_input_gives_empty_registry() {
        let reg = HoldRegistry::from_detections(&[], &HoldFilter::default());
        assert!(reg.is_empty());
    }

    #[test]
    fn detections_deserialize_from_json() {
        let json = r#"[{"x": 1.5, "y": 2.0, "width": 10, "height": 12, "class_id": 0, "confidence": 0.7}]"#;
        let dets: Vec<RawDetection> = serde_json::from_str(json).expect("parse");
        assert_eq!(dets[0].height, 12.0);
    }
}
