//! Generator variants and statistics under test
//!
//! The protocol values are positional in the kernel library, so the order of
//! `ALL` is the order every harness iterates in.

use std::fmt;

/// Gaussian generator algorithm selected by the kernel's mode argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratorVariant {
    HexagonalMarsagliaPolar,
    MarsagliaPolar,
    BoxMuller,
}

impl GeneratorVariant {
    pub const ALL: [GeneratorVariant; 3] = [
        GeneratorVariant::HexagonalMarsagliaPolar,
        GeneratorVariant::MarsagliaPolar,
        GeneratorVariant::BoxMuller,
    ];

    pub fn ordinal(self) -> u32 {
        match self {
            GeneratorVariant::HexagonalMarsagliaPolar => 1,
            GeneratorVariant::MarsagliaPolar => 2,
            GeneratorVariant::BoxMuller => 3,
        }
    }

    /// Value bound to the kernels' generator mode argument
    pub fn mode(self) -> u32 {
        self.ordinal()
    }

    pub fn name(self) -> &'static str {
        match self {
            GeneratorVariant::HexagonalMarsagliaPolar => "Hexagonal Marsaglia polar method",
            GeneratorVariant::MarsagliaPolar => "Marsaglia polar method",
            GeneratorVariant::BoxMuller => "Box-Muller transform",
        }
    }
}

impl fmt::Display for GeneratorVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Moment computed by the reduction kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MomentOrder {
    Mean,
    Variance,
    Skewness,
}

impl MomentOrder {
    pub const ALL: [MomentOrder; 3] = [MomentOrder::Mean, MomentOrder::Variance, MomentOrder::Skewness];

    /// Selector bound to the moment kernel's order argument
    pub fn ordinal(self) -> u32 {
        match self {
            MomentOrder::Mean => 1,
            MomentOrder::Variance => 2,
            MomentOrder::Skewness => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MomentOrder::Mean => "mean",
            MomentOrder::Variance => "variance",
            MomentOrder::Skewness => "skewness",
        }
    }
}

impl fmt::Display for MomentOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Moment(MomentOrder),
    Correlation,
}

impl Statistic {
    pub fn name(self) -> &'static str {
        match self {
            Statistic::Moment(order) => order.name(),
            Statistic::Correlation => "correlation",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
