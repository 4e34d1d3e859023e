//! Feature matrix and per-step feature vectors.

/// Feature values for one time step, in the matrix's column order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    time_index: usize,
    values: Vec<f64>,
}

impl FeatureVector {
    pub(crate) fn new(time_index: usize, values: Vec<f64>) -> Self {
        Self { time_index, values }
    }

    /// Index into the price series this vector was computed at.
    #[must_use]
    pub fn time_index(&self) -> usize {
        self.time_index
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Training rows built from a price history.
///
/// Row `i` holds the features at time `time_indices()[i]` and the forward
/// return from that step over the configured horizon. Rows are in
/// chronological order.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub(crate) names: Vec<String>,
    pub(crate) rows: Vec<Vec<f64>>,
    pub(crate) targets: Vec<f64>,
    pub(crate) time_indices: Vec<usize>,
    pub(crate) horizon: usize,
    pub(crate) unlabeled: Vec<FeatureVector>,
}

impl FeatureMatrix {
    /// Column names in order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Feature rows, one per training time step.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Forward returns aligned with [`rows`](Self::rows).
    #[must_use]
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Price-series index of each row.
    #[must_use]
    pub fn time_indices(&self) -> &[usize] {
        &self.time_indices
    }

    /// Forecast horizon the targets were computed over.
    #[must_use]
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Feature vectors for the final `horizon` steps, whose targets lie past
    /// the end of the series.
    #[must_use]
    pub fn unlabeled(&self) -> &[FeatureVector] {
        &self.unlabeled
    }

    /// Features at the final price, which has no target yet.
    #[must_use]
    pub fn latest(&self) -> &FeatureVector {
        // build() always produces `horizon >= 1` unlabeled vectors.
        &self.unlabeled[self.unlabeled.len() - 1]
    }

    /// Features at price index `t`, labeled or not.
    ///
    /// `None` before the indicator warmup or past the end of the series.
    #[must_use]
    pub fn features_at(&self, t: usize) -> Option<&[f64]> {
        let first = *self.time_indices.first()?;
        let offset = t.checked_sub(first)?;
        match self.rows.get(offset) {
            Some(row) => Some(row.as_slice()),
            None => self
                .unlabeled
                .get(offset - self.rows.len())
                .map(FeatureVector::values),
        }
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    /// Number of training rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the column called `name`.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Values of the column called `name`, one per row.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }
}
