//! **sromopt** — probability-weight fitting for Stochastic Reduced Order
//! Models (SROMs) with hand-coded analytic gradients.
//!
//! A SROM approximates a target random vector by a small set of fixed sample
//! points with adjustable probability weights.  This crate implements the
//! fitting pipeline:
//!
//! 1. **Grid** (`grid`): CDF evaluation grid over the target's support.
//! 2. **Objectives** (`objectives`): CDF / moment / correlation error terms.
//! 3. **Gradients** (`gradients`): closed-form d(error)/d(probability).
//! 4. **Optimiser** (`optimizer`): L-BFGS via `argmin`.
//!
//! The SROM model and the target random vector are external collaborators,
//! consumed through the `types::SromModel` and `types::TargetRandomVector`
//! traits.  All gradients are derived analytically — no AD framework needed.

pub mod types;
pub mod grid;
pub mod objectives;
pub mod gradients;
pub mod optimizer;
