use std::fmt;

/// Sepal length, sepal width, petal length, petal width, label.
pub const DATASET: [[f64; 5]; 12] = [
    [5.1, 3.5, 1.4, 0.2, 1.0],
    [4.9, 3.0, 1.4, 0.2, 1.0],
    [4.7, 3.2, 1.3, 0.2, 1.0],
    [4.6, 3.1, 1.5, 0.2, 1.0],
    [5.7, 2.8, 4.5, 1.3, 2.0],
    [6.3, 3.3, 4.7, 1.6, 2.0],
    [4.9, 2.4, 3.3, 1.0, 2.0],
    [6.6, 2.9, 4.6, 1.3, 2.0],
    [6.0, 3.0, 4.8, 1.8, 3.0],
    [6.9, 3.1, 5.4, 2.1, 3.0],
    [6.7, 3.1, 5.6, 2.4, 3.0],
    [6.9, 3.1, 5.1, 2.3, 3.0],
];

/// Half-width of the bucket around each integer label.
pub const TOLERANCE: f64 = 0.2;

pub fn dataset() -> Vec<Vec<f64>> {
    DATASET.iter().map(|row| row.to_vec()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Species {
    Setosa,
    Versicolor,
    Virginica,
}

impl Species {
    pub const ALL: [Species; 3] = [Species::Setosa, Species::Versicolor, Species::Virginica];

    pub fn label(self) -> f64 {
        match self {
            Species::Setosa => 1.0,
            Species::Versicolor => 2.0,
            Species::Virginica => 3.0,
        }
    }

    pub fn from_label(label: f64) -> Option<Species> {
        Self::ALL.into_iter().find(|species| species.label() == label)
    }

    /// `None` when the prediction falls outside every bucket.
    pub fn classify(prediction: f64) -> Option<Species> {
        Self::ALL
            .into_iter()
            .find(|species| (prediction - species.label()).abs() <= TOLERANCE)
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Species::Setosa => "Iris-setosa",
            Species::Versicolor => "Iris-versicolor",
            Species::Virginica => "Iris-virginica",
        };
        f.write_str(name)
    }
}
