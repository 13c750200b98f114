use crate::analyzers::types::Measure;
use crate::error::InsufficientData;

/// Running mean that stays undefined until the first value arrives.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn measure(&self) -> Measure {
        if self.count == 0 {
            Measure::undefined(InsufficientData::NoData)
        } else {
            Measure::defined(self.sum / self.count as f64)
        }
    }
}

/// Computes the arithmetic mean of a slice of values. Undefined for empty input.
pub fn mean(values: &[f64]) -> Measure {
    let mut acc = MeanAccumulator::default();
    for v in values {
        acc.push(*v);
    }
    acc.measure()
}

/// `part / whole * 100`, undefined when either side is undefined or `whole` is zero.
pub fn percent(part: Measure, whole: Measure) -> Measure {
    let whole = match whole.result() {
        Ok(w) if w == 0.0 => return Measure::undefined(InsufficientData::ZeroDenominator),
        Ok(w) => w,
        Err(reason) => return Measure::undefined(reason),
    };
    match part.result() {
        Ok(p) => Measure::defined(p / whole * 100.0),
        Err(reason) => Measure::undefined(reason),
    }
}

/// Share of `first` in `first + second`, as a percentage.
pub fn share(first: Measure, second: Measure) -> Measure {
    match (first.result(), second.result()) {
        (Ok(a), Ok(b)) => percent(Measure::defined(a), Measure::defined(a + b)),
        (Err(reason), _) | (_, Err(reason)) => Measure::undefined(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_of_empty_is_undefined() {
        assert_eq!(mean(&[]), Measure::undefined(InsufficientData::NoData));
    }

    #[test]
    fn test_mean_of_zeros_is_defined_zero() {
        assert_eq!(mean(&[0.0, 0.0]).value(), Some(0.0));
    }

    #[test]
    fn test_percent_guards_zero_denominator() {
        let result = percent(Measure::defined(5.0), Measure::defined(0.0));
        assert_eq!(
            result,
            Measure::undefined(InsufficientData::ZeroDenominator)
        );
        assert!(result.value().is_none());
    }

    #[test]
    fn test_percent_normal_values() {
        assert_eq!(
            percent(Measure::defined(25.0), Measure::defined(200.0)).value(),
            Some(12.5)
        );
    }

    #[test]
    fn test_share_of_two_sides() {
        assert_eq!(
            share(Measure::defined(300.0), Measure::defined(100.0)).value(),
            Some(75.0)
        );
        assert_eq!(
            share(Measure::defined(0.0), Measure::defined(0.0)),
            Measure::undefined(InsufficientData::ZeroDenominator)
        );
        assert_eq!(
            share(
                Measure::defined(10.0),
                Measure::undefined(InsufficientData::NoData)
            ),
            Measure::undefined(InsufficientData::NoData)
        );
    }
}
