//! Turn-radius constrained connecting curves.
//!
//! [`CurvePlanner`] is the seam the densifier uses; [`DubinsPlanner`] is the
//! shortest-path implementation for a vehicle with a minimum turn radius
//! (Dubins 1957), with the closed-form word solutions from A. Walker's
//! reference implementation.

use crate::models::Pose2D;
use crate::spatial::mod2pi;
use std::f64::consts::TAU;

/// Slack for round-off in the feasibility checks.
const FEASIBILITY_EPS: f64 = 1e-10;

/// Connects oriented points with turn-constrained curves and samples them.
pub trait CurvePlanner {
    type Curve;

    /// Shortest admissible curve between two poses, `None` if there is none.
    fn connect(&self, from: Pose2D, to: Pose2D, turn_radius: f64) -> Option<Self::Curve>;

    /// Ordered samples every `step` meters of arc, including both ends.
    fn sample(&self, curve: &Self::Curve, step: f64) -> Vec<Pose2D>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turn {
    Left,
    Straight,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DubinsWord {
    Lsl,
    Lsr,
    Rsl,
    Rsr,
    Rlr,
    Lrl,
}

impl DubinsWord {
    const ALL: [DubinsWord; 6] = [
        DubinsWord::Lsl,
        DubinsWord::Lsr,
        DubinsWord::Rsl,
        DubinsWord::Rsr,
        DubinsWord::Rlr,
        DubinsWord::Lrl,
    ];

    fn turns(self) -> [Turn; 3] {
        use Turn::*;
        match self {
            DubinsWord::Lsl => [Left, Straight, Left],
            DubinsWord::Lsr => [Left, Straight, Right],
            DubinsWord::Rsl => [Right, Straight, Left],
            DubinsWord::Rsr => [Right, Straight, Right],
            DubinsWord::Rlr => [Right, Left, Right],
            DubinsWord::Lrl => [Left, Right, Left],
        }
    }
}

/// Normalized problem description shared by all words.
struct Intermediate {
    alpha: f64,
    beta: f64,
    d: f64,
    sa: f64,
    sb: f64,
    ca: f64,
    cb: f64,
    c_ab: f64,
    d_sq: f64,
}

impl Intermediate {
    fn new(from: Pose2D, to: Pose2D, rho: f64) -> Self {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let distance = dx.hypot(dy);
        let d = distance / rho;
        let theta = if d > 0.0 { mod2pi(dy.atan2(dx)) } else { 0.0 };
        let alpha = mod2pi(from.heading - theta);
        let beta = mod2pi(to.heading - theta);

        Self {
            alpha,
            beta,
            d,
            sa: alpha.sin(),
            sb: beta.sin(),
            ca: alpha.cos(),
            cb: beta.cos(),
            c_ab: (alpha - beta).cos(),
            d_sq: d * d,
        }
    }

    /// Normalized segment lengths for `word`, if it is feasible.
    fn solve(&self, word: DubinsWord) -> Option<[f64; 3]> {
        match word {
            DubinsWord::Lsl => {
                let tmp0 = self.d + self.sa - self.sb;
                let p_sq = 2.0 + self.d_sq - 2.0 * self.c_ab + 2.0 * self.d * (self.sa - self.sb);
                if p_sq < -FEASIBILITY_EPS {
                    return None;
                }
                let tmp1 = (self.cb - self.ca).atan2(tmp0);
                Some([mod2pi(tmp1 - self.alpha), p_sq.max(0.0).sqrt(), mod2pi(self.beta - tmp1)])
            }
            DubinsWord::Rsr => {
                let tmp0 = self.d - self.sa + self.sb;
                let p_sq = 2.0 + self.d_sq - 2.0 * self.c_ab + 2.0 * self.d * (self.sb - self.sa);
                if p_sq < -FEASIBILITY_EPS {
                    return None;
                }
                let tmp1 = (self.ca - self.cb).atan2(tmp0);
                Some([mod2pi(self.alpha - tmp1), p_sq.max(0.0).sqrt(), mod2pi(tmp1 - self.beta)])
            }
            DubinsWord::Lsr => {
                let p_sq = -2.0 + self.d_sq + 2.0 * self.c_ab + 2.0 * self.d * (self.sa + self.sb);
                if p_sq < -FEASIBILITY_EPS {
                    return None;
                }
                let p = p_sq.max(0.0).sqrt();
                let tmp0 = (-self.ca - self.cb).atan2(self.d + self.sa + self.sb) - (-2.0f64).atan2(p);
                Some([mod2pi(tmp0 - self.alpha), p, mod2pi(tmp0 - mod2pi(self.beta))])
            }
            DubinsWord::Rsl => {
                let p_sq = -2.0 + self.d_sq + 2.0 * self.c_ab - 2.0 * self.d * (self.sa + self.sb);
                if p_sq < -FEASIBILITY_EPS {
                    return None;
                }
                let p = p_sq.max(0.0).sqrt();
                let tmp0 = (self.ca + self.cb).atan2(self.d - self.sa - self.sb) - 2.0f64.atan2(p);
                Some([mod2pi(self.alpha - tmp0), p, mod2pi(self.beta - tmp0)])
            }
            DubinsWord::Rlr => {
                let tmp0 = (6.0 - self.d_sq + 2.0 * self.c_ab + 2.0 * self.d * (self.sa - self.sb)) / 8.0;
                if tmp0.abs() > 1.0 + FEASIBILITY_EPS {
                    return None;
                }
                let tmp0 = tmp0.clamp(-1.0, 1.0);
                let phi = (self.ca - self.cb).atan2(self.d - self.sa + self.sb);
                let p = mod2pi(TAU - tmp0.acos());
                let t = mod2pi(self.alpha - phi + mod2pi(p / 2.0));
                Some([t, p, mod2pi(self.alpha - self.beta - t + mod2pi(p))])
            }
            DubinsWord::Lrl => {
                let tmp0 = (6.0 - self.d_sq + 2.0 * self.c_ab + 2.0 * self.d * (self.sb - self.sa)) / 8.0;
                if tmp0.abs() > 1.0 + FEASIBILITY_EPS {
                    return None;
                }
                let tmp0 = tmp0.clamp(-1.0, 1.0);
                let phi = (self.ca - self.cb).atan2(self.d + self.sa - self.sb);
                let p = mod2pi(TAU - tmp0.acos());
                let t = mod2pi(-self.alpha - phi + p / 2.0);
                Some([t, p, mod2pi(mod2pi(self.beta) - self.alpha - t + mod2pi(p))])
            }
        }
    }
}

/// One Dubins path: start pose, turn radius, word and normalized lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct DubinsCurve {
    pub start: Pose2D,
    pub end: Pose2D,
    pub turn_radius: f64,
    pub word: DubinsWord,
    segments: [f64; 3],
}

impl DubinsCurve {
    /// Arc length in meters.
    pub fn length(&self) -> f64 {
        self.segments.iter().sum::<f64>() * self.turn_radius
    }

    /// Pose at arc length `s` from the start.
    pub fn pose_at(&self, s: f64) -> Pose2D {
        let t = (s / self.turn_radius).max(0.0);
        let turns = self.word.turns();
        let origin = Pose2D::new(0.0, 0.0, self.start.heading);

        let q1 = advance(origin, self.segments[0], turns[0]);
        let q2 = advance(q1, self.segments[1], turns[1]);

        let q = if t < self.segments[0] {
            advance(origin, t, turns[0])
        } else if t < self.segments[0] + self.segments[1] {
            advance(q1, t - self.segments[0], turns[1])
        } else {
            advance(q2, t - self.segments[0] - self.segments[1], turns[2])
        };

        Pose2D::new(
            q.x * self.turn_radius + self.start.x,
            q.y * self.turn_radius + self.start.y,
            mod2pi(q.heading),
        )
    }
}

/// Move along one normalized segment of length `t`.
fn advance(q: Pose2D, t: f64, turn: Turn) -> Pose2D {
    let (st, ct) = q.heading.sin_cos();
    match turn {
        Turn::Left => Pose2D::new(
            q.x + (q.heading + t).sin() - st,
            q.y - (q.heading + t).cos() + ct,
            q.heading + t,
        ),
        Turn::Right => Pose2D::new(
            q.x - (q.heading - t).sin() + st,
            q.y + (q.heading - t).cos() - ct,
            q.heading - t,
        ),
        Turn::Straight => Pose2D::new(q.x + ct * t, q.y + st * t, q.heading),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DubinsPlanner;

impl CurvePlanner for DubinsPlanner {
    type Curve = DubinsCurve;

    fn connect(&self, from: Pose2D, to: Pose2D, turn_radius: f64) -> Option<DubinsCurve> {
        if turn_radius.is_nan() || turn_radius <= 0.0 {
            return None;
        }
        let problem = Intermediate::new(from, to, turn_radius);

        DubinsWord::ALL
            .iter()
            .filter_map(|word| problem.solve(*word).map(|segments| (*word, segments)))
            .min_by(|a, b| {
                let la: f64 = a.1.iter().sum();
                let lb: f64 = b.1.iter().sum();
                la.total_cmp(&lb)
            })
            .map(|(word, segments)| DubinsCurve {
                start: from,
                end: to,
                turn_radius,
                word,
                segments,
            })
    }

    fn sample(&self, curve: &DubinsCurve, step: f64) -> Vec<Pose2D> {
        let length = curve.length();
        let step = if step > 0.0 { step } else { length.max(1.0) };

        let mut samples = Vec::new();
        let mut s = 0.0;
        while s < length {
            samples.push(curve.pose_at(s));
            s += step;
        }
        samples.push(Pose2D::new(curve.end.x, curve.end.y, mod2pi(curve.end.heading)));
        samples
    }
}

/// Total heading swept by a curve, radians.
pub fn total_turn(curve: &DubinsCurve) -> f64 {
    let turns = curve.word.turns();
    curve
        .segments
        .iter()
        .zip(turns.iter())
        .filter(|(_, turn)| **turn != Turn::Straight)
        .map(|(t, _)| *t)
        .sum()
}
