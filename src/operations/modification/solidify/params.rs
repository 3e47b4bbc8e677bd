#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{OperationError, Result};
use crate::math::vector_3d::clamp_nonzero;

/// How the offset position of each vertex fan is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OffsetMode {
    /// Average of the adjacent face normals.
    Fixed,
    /// Corner-angle weighted average, rescaled towards uniform thickness.
    Even,
    /// Position that satisfies the offset plane of every distinct face.
    #[default]
    Constraints,
}

/// Correction applied to vertices on open boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BoundaryMode {
    /// No correction.
    #[default]
    None,
    /// Keep the offset in the plane spanned by the two boundary edges.
    Flat,
    /// Keep the offset in a plane blended from the two boundary faces.
    Blended,
}

/// Parameters of the [`Solidify`](super::Solidify) operation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolidifyParams {
    /// Shell thickness. Negative values offset against the normals.
    pub thickness: f64,
    /// Share of the thickness placed behind the surface, `[0, 1]`.
    pub offset_factor: f64,
    /// Clamp factor relative to the shortest incident edge, `0` disables.
    pub clamp: f64,
    /// Clamp by the sharpest dihedral angle instead of edge length only.
    pub angle_clamp: bool,
    pub offset_mode: OffsetMode,
    pub boundary_mode: BoundaryMode,
    /// Generate rim faces along open boundaries.
    pub rim: bool,
    /// Generate the shell faces. Only honoured as `false` when `rim` is set.
    pub shell: bool,
    /// Flip the resulting normals.
    pub flip: bool,
    /// Vertices closer than this are welded.
    pub merge_tolerance: f64,
    /// Material offset for shell faces of the flipped side.
    pub material_offset: i32,
    /// Material offset for rim faces.
    pub rim_material_offset: i32,
    /// Number of material slots, at least 1.
    pub material_count: u16,
    /// Bevel weight added to convex edges (subtracted for negative values), `[-1, 1]`.
    pub bevel_convex: f64,
    /// Vertex group scaling the thickness.
    pub vertex_group: Option<String>,
    pub invert_vertex_group: bool,
    /// Thickness factor for vertices with zero weight, `[0, 1]`.
    pub vertex_group_factor: f64,
    /// Use one weight per face, the minimum over its vertices.
    pub flat_faces: bool,
    /// Group receiving every emitted shell vertex of the flipped side.
    pub shell_vertex_group: Option<String>,
    /// Group receiving every emitted rim vertex.
    pub rim_vertex_group: Option<String>,
}

impl Default for SolidifyParams {
    fn default() -> Self {
        Self {
            thickness: 0.01,
            offset_factor: 0.5,
            clamp: 0.0,
            angle_clamp: false,
            offset_mode: OffsetMode::default(),
            boundary_mode: BoundaryMode::default(),
            rim: true,
            shell: true,
            flip: false,
            merge_tolerance: 1e-4,
            material_offset: 0,
            rim_material_offset: 0,
            material_count: 1,
            bevel_convex: 0.0,
            vertex_group: None,
            invert_vertex_group: false,
            vertex_group_factor: 0.0,
            flat_faces: false,
            shell_vertex_group: None,
            rim_vertex_group: None,
        }
    }
}

impl SolidifyParams {
    /// Creates parameters with the given thickness and defaults otherwise.
    #[must_use]
    pub fn new(thickness: f64) -> Self {
        Self {
            thickness,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_offset_factor(mut self, offset_factor: f64) -> Self {
        self.offset_factor = offset_factor;
        self
    }

    #[must_use]
    pub fn with_clamp(mut self, clamp: f64, angle_clamp: bool) -> Self {
        self.clamp = clamp;
        self.angle_clamp = angle_clamp;
        self
    }

    #[must_use]
    pub fn with_offset_mode(mut self, mode: OffsetMode) -> Self {
        self.offset_mode = mode;
        self
    }

    #[must_use]
    pub fn with_boundary_mode(mut self, mode: BoundaryMode) -> Self {
        self.boundary_mode = mode;
        self
    }

    #[must_use]
    pub fn with_rim(mut self, rim: bool) -> Self {
        self.rim = rim;
        self
    }

    #[must_use]
    pub fn with_shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    #[must_use]
    pub fn with_flip(mut self, flip: bool) -> Self {
        self.flip = flip;
        self
    }

    #[must_use]
    pub fn with_merge_tolerance(mut self, tolerance: f64) -> Self {
        self.merge_tolerance = tolerance;
        self
    }

    /// Sets the material slot count and the shell and rim offsets.
    #[must_use]
    pub fn with_materials(mut self, count: u16, offset: i32, rim_offset: i32) -> Self {
        self.material_count = count;
        self.material_offset = offset;
        self.rim_material_offset = rim_offset;
        self
    }

    #[must_use]
    pub fn with_bevel_convex(mut self, bevel_convex: f64) -> Self {
        self.bevel_convex = bevel_convex;
        self
    }

    /// Scales the thickness by the weights of the named group.
    #[must_use]
    pub fn with_vertex_group(mut self, name: impl Into<String>, invert: bool, factor: f64) -> Self {
        self.vertex_group = Some(name.into());
        self.invert_vertex_group = invert;
        self.vertex_group_factor = factor;
        self
    }

    #[must_use]
    pub fn with_flat_faces(mut self, flat_faces: bool) -> Self {
        self.flat_faces = flat_faces;
        self
    }

    #[must_use]
    pub fn with_shell_vertex_group(mut self, name: impl Into<String>) -> Self {
        self.shell_vertex_group = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_rim_vertex_group(mut self, name: impl Into<String>) -> Self {
        self.rim_vertex_group = Some(name.into());
        self
    }

    /// Checks that every value is finite and every factor is in range.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("thickness", self.thickness),
            ("offset_factor", self.offset_factor),
            ("clamp", self.clamp),
            ("merge_tolerance", self.merge_tolerance),
            ("bevel_convex", self.bevel_convex),
            ("vertex_group_factor", self.vertex_group_factor),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(invalid(format!("{name} must be finite, got {value}")));
            }
        }
        let ranges = [
            ("offset_factor", self.offset_factor, 0.0, 1.0),
            ("clamp", self.clamp, 0.0, f64::MAX),
            ("merge_tolerance", self.merge_tolerance, 0.0, f64::MAX),
            ("bevel_convex", self.bevel_convex, -1.0, 1.0),
            ("vertex_group_factor", self.vertex_group_factor, 0.0, 1.0),
        ];
        for (name, value, lo, hi) in ranges {
            if !(lo..=hi).contains(&value) {
                return Err(invalid(format!("{name} must be in [{lo}, {hi}], got {value}")));
            }
        }
        if self.material_count == 0 {
            return Err(invalid("material_count must be at least 1".into()));
        }
        Ok(())
    }
}

fn invalid(message: String) -> crate::error::SolidusError {
    OperationError::InvalidInput(message).into()
}

/// Per-invocation constants derived from [`SolidifyParams`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Resolved {
    /// Offset along the normal, never closer to zero than `1e-5`.
    pub ofs_front_clamped: f64,
    /// Offset against the normal, never closer to zero than `1e-5`.
    pub ofs_back_clamped: f64,
    /// Absolute thickness times the clamp factor.
    pub clamp_length: f64,
    /// Constraint planes closer than this dot product are not intersected.
    pub stop_explosion: f64,
    pub do_flip: bool,
    pub do_rim: bool,
    pub do_shell: bool,
    pub do_clamp: bool,
    /// Effective material slot count.
    pub material_slots: i32,
    pub material_offset: i32,
    pub rim_material_offset: i32,
}

impl Resolved {
    pub fn new(params: &SolidifyParams) -> Self {
        let t = params.thickness;
        let f = params.offset_factor;
        let ofs_front = (1.0 - f) * t;
        let ofs_back = f * t;
        let material_slots = i32::from(params.material_count.max(1));
        let (material_offset, rim_material_offset) = if material_slots > 1 {
            (params.material_offset, params.rim_material_offset)
        } else {
            (0, 0)
        };
        Self {
            ofs_front_clamped: clamp_nonzero(ofs_front, 1e-5),
            ofs_back_clamped: clamp_nonzero(ofs_back, 1e-5),
            clamp_length: t.abs() * params.clamp,
            stop_explosion: 0.999 - (1.0 - 2.0 * f).abs() * 0.05,
            do_flip: params.flip == (t > 0.0),
            do_rim: params.rim,
            do_shell: params.shell || !params.rim,
            do_clamp: params.clamp != 0.0,
            material_slots,
            material_offset,
            rim_material_offset,
        }
    }

    /// Applies `offset` to `material` and clamps into the available slots.
    pub fn material(&self, material: i32, offset: i32) -> i32 {
        material.saturating_add(offset).clamp(0, self.material_slots - 1)
    }
}
