//! # fitframe
//!
//! Fit arbitrary source images into a fixed target box. One request names a
//! target width and height plus a [fit policy](imaging::FitPolicy), and the
//! result is always a PNG of exactly the target size.
//!
//! # Architecture: One Pipeline, Three Policies
//!
//! Every transform runs the same stages; the policy only changes the numbers
//! the planner produces and what the compositor does with them:
//!
//! ```text
//! bytes ─► decode ─► plan geometry ─► resample ─► composite ─► encode ─► PNG
//!                    (pure math)      (Lanczos3)  (crop | pad)
//! ```
//!
//! | Policy | Scaled size | Canvas |
//! |--------|-------------|--------|
//! | `stretch` | target (fits inside it when keeping aspect) | target (letterboxed when keeping aspect) |
//! | `crop-to-fill` | covers target | centered crop window |
//! | `pad-to-fit` | fits inside target | target, filled with `fill_color` |
//!
//! Geometry is a pure function from dimensions to a [`imaging::GeometryPlan`],
//! so most behavior is unit-testable without touching pixels.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | The transform core: params, geometry planning, backend, compositing, orchestration |
//! | [`store`] | Blob store and metadata recorder contracts, with filesystem and in-memory versions |
//! | [`process`] | Runs jobs (fetch, transform, store, record), in parallel for batches |
//! | [`config`] | `fitframe.toml` loading, validation and stock defaults |
//! | [`logging`] | `tracing-subscriber` setup for the binary |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Failures Are Values
//!
//! [`imaging::transform`] never panics and never returns `Err`. Every outcome is
//! an [`imaging::ResultImage`], and failures carry an [`imaging::ErrorKind`]
//! that maps onto a client-vs-server status code. Callers that prefer `?` use
//! [`imaging::try_transform`].
//!
//! ## Deterministic PNG Output
//!
//! Output is always PNG. Fully opaque canvases are written as RGB, everything
//! else as RGBA, so identical input and request produce identical bytes. The
//! filesystem store leans on this: results are content-addressed by SHA-256.
//!
//! ## No Storage in the Core
//!
//! The imaging core takes bytes and returns bytes. Where sources come from and
//! where results go is the [`store`] collaborators' business, which keeps the
//! core synchronous and free of I/O.

pub mod config;
pub mod imaging;
pub mod logging;
pub mod output;
pub mod process;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;
