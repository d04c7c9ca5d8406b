use glam::Vec3;
use serde::Deserialize;

pub mod pose {
    pub const NOSE: usize = 0;
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_ELBOW: usize = 13;
    pub const RIGHT_ELBOW: usize = 14;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
}

pub mod hand {
    pub const WRIST: usize = 0;
    pub const THUMB_BASE: usize = 1;
    pub const INDEX_BASE: usize = 5;
    pub const MIDDLE_BASE: usize = 9;
    pub const RING_BASE: usize = 13;
    pub const PINKY_BASE: usize = 17;

    /// Wrist plus the four finger bases; their mean is the palm centroid.
    pub const PALM: [usize; 5] = [WRIST, INDEX_BASE, MIDDLE_BASE, RING_BASE, PINKY_BASE];
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Tracker confidence in [0,1]. Hand trackers omit it; absent reads as fully visible.
    #[serde(default)]
    pub visibility: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, visibility: None }
    }

    pub fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn confidence(&self) -> f32 {
        self.visibility.unwrap_or(1.0)
    }

    /// Finite position and a confidence at or above `threshold`.
    pub fn is_usable(&self, threshold: f32) -> bool {
        self.position().is_finite() && self.confidence() >= threshold
    }
}

/// One tracker tick. Each landmark group is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandmarkFrame {
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub face_landmarks: Option<Vec<Landmark>>,
    #[serde(default)]
    pub pose_landmarks: Option<Vec<Landmark>>,
    #[serde(default)]
    pub left_hand_landmarks: Option<Vec<Landmark>>,
    #[serde(default)]
    pub right_hand_landmarks: Option<Vec<Landmark>>,
}

impl LandmarkFrame {
    pub fn pose(&self, index: usize) -> Option<&Landmark> {
        self.pose_landmarks.as_ref().and_then(|points| points.get(index))
    }

    pub fn has_pose(&self) -> bool {
        self.pose_landmarks.as_ref().is_some_and(|points| !points.is_empty())
    }

    pub fn has_face(&self) -> bool {
        self.face_landmarks.as_ref().is_some_and(|points| !points.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_groups_and_visibility_deserialize() {
        let json = r#"{"timestamp": 1.5, "poseLandmarks": [{"x": 0.1, "y": 0.2, "z": 0.3}]}"#;
        let frame: LandmarkFrame = serde_json::from_str(json).expect("frame");
        assert!(frame.has_pose());
        assert!(!frame.has_face());
        assert!(frame.left_hand_landmarks.is_none());
        let point = frame.pose(0).expect("landmark");
        assert_eq!(point.confidence(), 1.0);
        assert!(frame.pose(11).is_none());
    }

    #[test]
    fn non_finite_points_are_unusable() {
        let point = Landmark::new(f32::NAN, 0.0, 0.0).with_visibility(1.0);
        assert!(!point.is_usable(0.5));
        assert!(!Landmark::new(0.0, 0.0, 0.0).with_visibility(0.2).is_usable(0.5));
    }
}
