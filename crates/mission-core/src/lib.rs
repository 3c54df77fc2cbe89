pub mod assembler;
pub mod coverage;
pub mod densify;
pub mod dubins;
pub mod error;
pub mod geodesy;
pub mod maneuver;
pub mod mission;
pub mod models;
pub mod progress;
pub mod rules;
pub mod spatial;

pub use assembler::{
    ControlWaypoint, MissionAssembler, MissionControlMessage, MissionSource, TravelValues,
};
pub use coverage::{CoverageParams, CoveragePlanner, LawnmowerCoverage};
pub use densify::{PathDensifier, SignificantPoint};
pub use dubins::{CurvePlanner, DubinsCurve, DubinsPlanner};
pub use error::{Diagnostics, MissionError};
pub use geodesy::{
    Availability, FallbackChain, FrameTransformGateway, GeodesyEndpoint, GeodesyError,
    UtmProjection,
};
pub use maneuver::{Maneuver, ManeuverBody, ManeuverDecoder, PlanDbMessage, PlanManeuver};
pub use mission::MissionPlan;
pub use models::{
    FrameTag, GeoPoint, ManeuverKind, PlanarPoint, Pose, Pose2D, PoseList, SampleFlags,
    SpeedControl, VerticalControl, Waypoint, WaypointPayload,
};
pub use progress::{MissionProgress, MissionState};
pub use rules::{PlannerRules, SimilarityRules};
pub use spatial::{planar_distance, poses_with_heading};
