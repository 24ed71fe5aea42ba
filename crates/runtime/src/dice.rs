use rand::Rng;

use crate::DomainError;

/// A parsed dice expression of the form `NdM`, `NdM+K` or `NdM-K`
/// ("2d6+3"). Count and sides must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceExpression {
    pub count: u32,
    pub sides: u32,
    pub modifier: i64,
}

#[derive(Debug, Clone)]
pub struct RolledDice {
    pub rolls: Vec<i64>,
    pub total: i64,
}

fn parse_unsigned(raw: &str, what: &str, expression: &str) -> Result<u32, DomainError> {
    // u32::from_str would accept a leading '+', the wire grammar does not
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DomainError::Validation(format!(
            "invalid dice expression '{expression}': bad {what}"
        )));
    }
    raw.parse::<u32>().map_err(|_| {
        DomainError::Validation(format!(
            "invalid dice expression '{expression}': {what} out of range"
        ))
    })
}

impl DiceExpression {
    /// Accepts exactly the grammar `^\d+d\d+([+-]\d+)?$`.
    pub fn parse(expression: &str) -> Result<Self, DomainError> {
        let invalid = || {
            DomainError::Validation(format!("invalid dice expression '{expression}'"))
        };

        let (count_str, rest) = expression.split_once('d').ok_or_else(invalid)?;

        let (sides_str, modifier) = match rest.find(|c| c == '+' || c == '-') {
            Some(pos) => {
                let (sides_str, modifier_str) = rest.split_at(pos);
                let digits = &modifier_str[1..];
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                let magnitude: i64 = digits.parse().map_err(|_| invalid())?;
                let modifier = if modifier_str.starts_with('-') {
                    -magnitude
                } else {
                    magnitude
                };
                (sides_str, modifier)
            }
            None => (rest, 0),
        };

        let count = parse_unsigned(count_str, "dice count", expression)?;
        let sides = parse_unsigned(sides_str, "side count", expression)?;

        if count == 0 || sides == 0 {
            return Err(DomainError::Validation(format!(
                "invalid dice expression '{expression}': count and sides must be positive"
            )));
        }

        Ok(Self {
            count,
            sides,
            modifier,
        })
    }

    /// Rolls with the given RNG; each die lands in `[1, sides]` and the
    /// total is `sum(rolls) + modifier`.
    pub fn roll_with<R: Rng + ?Sized>(&self, rng: &mut R) -> RolledDice {
        let rolls: Vec<i64> = (0..self.count)
            .map(|_| rng.random_range(1..=i64::from(self.sides)))
            .collect();
        let total = rolls.iter().sum::<i64>() + self.modifier;
        RolledDice { rolls, total }
    }

    pub fn roll(&self) -> RolledDice {
        self.roll_with(&mut rand::rng())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn parses_plain_and_modified_expressions() {
        assert_eq!(
            DiceExpression::parse("2d6+3").unwrap(),
            DiceExpression { count: 2, sides: 6, modifier: 3 }
        );
        assert_eq!(
            DiceExpression::parse("1d20-4").unwrap(),
            DiceExpression { count: 1, sides: 20, modifier: -4 }
        );
        assert_eq!(
            DiceExpression::parse("3d8").unwrap(),
            DiceExpression { count: 3, sides: 8, modifier: 0 }
        );
    }

    #[test]
    fn rejects_malformed_expressions() {
        for raw in [
            "", "d6", "2d", "2d6+", "2d6-", "2x6", "2d6+3+1", "+2d6", "2d+6", "2d6 +3",
            "two d six", "2.5d6", "-1d6",
        ] {
            assert!(DiceExpression::parse(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn rejects_zero_count_and_zero_sides() {
        assert!(DiceExpression::parse("0d6").is_err());
        assert!(DiceExpression::parse("2d0").is_err());
    }

    #[test]
    fn rolls_stay_in_bounds_and_sum_up() {
        let mut rng = StdRng::seed_from_u64(7);
        let expr = DiceExpression::parse("4d10+5").unwrap();
        for _ in 0..200 {
            let rolled = expr.roll_with(&mut rng);
            assert_eq!(rolled.rolls.len(), 4);
            assert!(rolled.rolls.iter().all(|&r| (1..=10).contains(&r)));
            assert_eq!(rolled.total, rolled.rolls.iter().sum::<i64>() + 5);
        }
    }

    #[test]
    fn negative_modifier_can_push_total_below_count() {
        let mut rng = StdRng::seed_from_u64(11);
        let expr = DiceExpression::parse("1d4-10").unwrap();
        let rolled = expr.roll_with(&mut rng);
        assert!(rolled.total <= -6);
    }
}
