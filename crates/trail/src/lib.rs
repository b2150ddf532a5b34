//! Core simulation state for the inkfield particle viewer.
//!
//! Everything in this crate is pure CPU state with no GPU or windowing
//! dependencies, so the whole interactive pipeline can be unit tested. The
//! per-frame flow the renderer drives looks like:
//!
//! ```text
//!   pointer event ──▶ ndc_from_screen ──▶ Ray::from_ndc
//!                                             │
//!                      ReferenceSurface::intersect ──▶ CursorState
//!                                                          │
//!                              DisplacementBuffer::advance ─┘
//!                                     │
//!                                     └──▶ R8 texture upload (renderer)
//! ```
//!
//! [`FieldLayout`] carries the aspect-tier policy that sizes the particle
//! grid and the displacement buffer, and [`FieldSlot`] guards the
//! release-then-create ordering when the active image changes.

mod cursor;
mod displacement;
mod field;
mod lifecycle;
mod pointer;

pub use cursor::{CursorState, CursorStep};
pub use displacement::{
    DisplacementBuffer, Tuning, FADE_OPACITY, GLOW_SIZE_DIVISOR, SPEED_SENSITIVITY,
};
pub use field::{
    particle_seeds, FieldError, FieldLayout, ParticleSeed, BASE_PLANE_HEIGHT, BUFFER_HEIGHT,
    WIDESCREEN_ASPECT,
};
pub use lifecycle::FieldSlot;
pub use pointer::{ndc_from_screen, uv_to_buffer, Ray, ReferenceSurface};
