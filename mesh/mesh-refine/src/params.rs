//! Parameters for quality refinement.

use nalgebra::Point2;

/// User veto: given the corner positions and area of a triangle, return
/// `true` if the triangle must be split.
pub type UserTest = fn(Point2<f64>, Point2<f64>, Point2<f64>, f64) -> bool;

/// Policy for splitting encroached subsegments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentSplitPolicy {
    /// Split any encroached subsegment.
    #[default]
    Always,
    /// Split only subsegments with triangles on both sides (never the
    /// domain boundary).
    InteriorOnly,
    /// Never split subsegments.
    Never,
}

/// Parameters for quality refinement.
#[derive(Debug, Clone)]
pub struct RefineParams {
    /// Lower bound on the smallest angle, in degrees. 0 disables.
    pub min_angle: f64,

    /// Upper bound on the largest angle, in degrees. 0 disables.
    pub max_angle: f64,

    /// Global triangle area cap. `None` disables.
    pub max_area: Option<f64>,

    /// Honor each triangle's own area target
    /// ([`mesh_cdt::Mesh::area_target`]).
    pub var_area: bool,

    /// User-supplied veto on triangles.
    pub user_test: Option<UserTest>,

    /// Ruppert's diametral circles instead of Chew's diametral lenses.
    /// Produces a truly conforming Delaunay triangulation at the price of
    /// more segment splits.
    pub ruppert: bool,

    /// Which encroached subsegments may be split.
    pub segment_split: SegmentSplitPolicy,

    /// Maximum number of Steiner points to insert. `None` is unlimited.
    pub steiner_limit: Option<usize>,

    /// Skip the exact-arithmetic collinearity refinement of new segment
    /// split points.
    pub no_exact_split: bool,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            min_angle: 0.0,
            max_angle: 0.0,
            max_area: None,
            var_area: false,
            user_test: None,
            ruppert: false,
            segment_split: SegmentSplitPolicy::Always,
            steiner_limit: None,
            no_exact_split: false,
        }
    }
}

impl RefineParams {
    /// Params with a minimum-angle bound in degrees.
    #[must_use]
    pub fn with_min_angle(degrees: f64) -> Self {
        Self {
            min_angle: degrees,
            ..Default::default()
        }
    }

    /// Set the maximum-angle bound in degrees.
    #[must_use]
    pub const fn and_max_angle(mut self, degrees: f64) -> Self {
        self.max_angle = degrees;
        self
    }

    /// Set the global area cap.
    #[must_use]
    pub const fn and_max_area(mut self, area: f64) -> Self {
        self.max_area = Some(area);
        self
    }

    /// Honor per-triangle area targets.
    #[must_use]
    pub const fn and_var_area(mut self) -> Self {
        self.var_area = true;
        self
    }

    /// Install a user veto.
    #[must_use]
    pub fn and_user_test(mut self, test: UserTest) -> Self {
        self.user_test = Some(test);
        self
    }

    /// Use Ruppert's diametral-circle encroachment.
    #[must_use]
    pub const fn and_ruppert(mut self) -> Self {
        self.ruppert = true;
        self
    }

    /// Set the subsegment split policy.
    #[must_use]
    pub const fn and_segment_split(mut self, policy: SegmentSplitPolicy) -> Self {
        self.segment_split = policy;
        self
    }

    /// Cap the number of Steiner points.
    #[must_use]
    pub const fn and_steiner_limit(mut self, limit: usize) -> Self {
        self.steiner_limit = Some(limit);
        self
    }

    /// Whether any triangle-quality criterion is active (the driver skips
    /// the triangle phase entirely otherwise).
    #[must_use]
    pub fn wants_triangle_quality(&self) -> bool {
        self.min_angle > 0.0 || self.max_area.is_some() || self.var_area || self.user_test.is_some()
    }
}

/// Constants derived from [`RefineParams`] once per run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Derived {
    /// `cos^2` of the minimum angle; 1.0 when the bound is disabled.
    pub good_angle: f64,
    /// Lens shape factor `(2*good_angle - 1)^2` for Chew's diametral
    /// lenses.
    pub lens_factor: f64,
    /// Signed cosine threshold for the maximum-angle test
    /// (`cos(180 deg - 2*max_angle)`); meaningless when `max_angle` is 0.
    pub max_good_angle: f64,
    /// Off-center relocation constant, `0.475 * sqrt((1+cos)/(1-cos))`.
    pub off_constant: f64,
}

impl Derived {
    pub(crate) fn from_params(params: &RefineParams) -> Self {
        let cos_min = params.min_angle.to_radians().cos();
        let good_angle = cos_min * cos_min;
        let lens = 2.0 * good_angle - 1.0;
        let off_constant = if cos_min >= 1.0 {
            0.0
        } else {
            0.475 * ((1.0 + cos_min) / (1.0 - cos_min)).sqrt()
        };
        let max_good_angle = if params.max_angle == 0.0 {
            0.0
        } else {
            (180.0 - 2.0 * params.max_angle).to_radians().cos()
        };
        Self {
            good_angle,
            lens_factor: lens * lens,
            max_good_angle,
            off_constant,
        }
    }
}
