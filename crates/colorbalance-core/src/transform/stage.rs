//! The pipeline stage that owns a parameter record and its coefficients.
//!
//! Every commit derives a fresh [`DerivedCoefficients`] behind a new `Arc`.
//! Passes already running keep the snapshot they cloned, so coefficients are
//! never mutated while a backend reads them.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::coefficients::{DerivedCoefficients, derive};
use super::params::ColorBalanceParams;

/// Parameter record plus the coefficients derived from it.
#[derive(Debug, Clone)]
pub struct GradingStage {
    params: ColorBalanceParams,
    coefficients: Arc<DerivedCoefficients>,
    revision: u64,
}

impl Default for GradingStage {
    fn default() -> Self {
        Self::new(ColorBalanceParams::default())
    }
}

impl GradingStage {
    pub fn new(params: ColorBalanceParams) -> Self {
        Self {
            coefficients: Arc::new(derive(&params)),
            params,
            revision: 0,
        }
    }

    pub fn params(&self) -> &ColorBalanceParams {
        &self.params
    }

    /// Snapshot of the current coefficients for one processing pass.
    pub fn coefficients(&self) -> Arc<DerivedCoefficients> {
        Arc::clone(&self.coefficients)
    }

    /// Number of commits since creation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace the whole record and commit.
    pub fn set_params(&mut self, params: ColorBalanceParams) {
        self.params = params;
        self.commit();
    }

    /// Edit the record in place and commit once.
    pub fn update<R>(&mut self, edit: impl FnOnce(&mut ColorBalanceParams) -> R) -> R {
        let result = edit(&mut self.params);
        self.commit();
        result
    }

    /// Begin a multi-field edit. The stage commits once when the guard drops.
    pub fn batch(&mut self) -> BatchUpdate<'_> {
        BatchUpdate { stage: self }
    }

    fn commit(&mut self) {
        self.coefficients = Arc::new(derive(&self.params));
        self.revision += 1;
        tracing::debug!(revision = self.revision, mode = ?self.params.mode, "committed color balance params");
    }
}

/// Scoped multi-field edit of a [`GradingStage`].
///
/// Edits made through the guard do not commit individually.
pub struct BatchUpdate<'a> {
    stage: &'a mut GradingStage,
}

impl Deref for BatchUpdate<'_> {
    type Target = ColorBalanceParams;

    fn deref(&self) -> &Self::Target {
        &self.stage.params
    }
}

impl DerefMut for BatchUpdate<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.stage.params
    }
}

impl Drop for BatchUpdate<'_> {
    fn drop(&mut self) {
        self.stage.commit();
    }
}

/// A stage shared between a control thread and processing threads.
#[derive(Debug, Clone, Default)]
pub struct SharedStage(Arc<RwLock<GradingStage>>);

impl SharedStage {
    pub fn new(stage: GradingStage) -> Self {
        Self(Arc::new(RwLock::new(stage)))
    }

    /// Coefficient snapshot for a pass. Holds the read lock only briefly.
    pub fn coefficients(&self) -> Arc<DerivedCoefficients> {
        self.0.read().coefficients()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, GradingStage> {
        self.0.read()
    }

    /// Exclusive access for edits and solver runs.
    pub fn write(&self) -> RwLockWriteGuard<'_, GradingStage> {
        self.0.write()
    }
}
