// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::CronSchedule;

fn fields(expr: &str) -> Vec<String> {
    expr.split_whitespace().map(str::to_string).collect()
}

fn num(field: &str) -> u32 {
    field.parse().unwrap()
}

#[yare::parameterized(
    hourly  = { RandomSchedule::Hourly,  ["*", "*", "*", "*"] },
    daily   = { RandomSchedule::Daily,   ["N", "*", "*", "*"] },
    weekly  = { RandomSchedule::Weekly,  ["N", "*", "*", "N"] },
    monthly = { RandomSchedule::Monthly, ["N", "N", "*", "*"] },
    yearly  = { RandomSchedule::Yearly,  ["N", "N", "N", "*"] },
)]
fn shape_per_class(class: RandomSchedule, rest: [&str; 4]) {
    let randomizer = Randomizer::seeded(7);
    for _ in 0..50 {
        let expr = randomizer.generate(class);
        let f = fields(&expr);
        assert_eq!(f.len(), 5, "{expr}");
        assert!(num(&f[0]) < 60);
        for (field, shape) in f[1..].iter().zip(rest) {
            if shape == "*" {
                assert_eq!(field, "*", "{expr}");
            } else {
                num(field);
            }
        }
    }
}

#[test]
fn ranges_hold() {
    let randomizer = Randomizer::seeded(42);
    for _ in 0..200 {
        let f = fields(&randomizer.generate(RandomSchedule::Yearly));
        assert!(num(&f[1]) < 24);
        assert!((1..=27).contains(&num(&f[2])));
        assert!((1..=12).contains(&num(&f[3])));

        let w = fields(&randomizer.generate(RandomSchedule::Weekly));
        assert!(num(&w[4]) <= 6);
    }
}

#[test]
fn same_seed_same_sequence() {
    let a = Randomizer::seeded(1);
    let b = Randomizer::seeded(1);
    for _ in 0..10 {
        assert_eq!(
            a.generate(RandomSchedule::Daily),
            b.generate(RandomSchedule::Daily)
        );
    }
}

#[test]
fn generated_expressions_parse() {
    let randomizer = Randomizer::new();
    let now = chrono::Utc::now();
    for class in [
        RandomSchedule::Hourly,
        RandomSchedule::Daily,
        RandomSchedule::Weekly,
        RandomSchedule::Monthly,
        RandomSchedule::Yearly,
    ] {
        for _ in 0..20 {
            let expr = randomizer.generate(class);
            CronSchedule::parse(&expr, &now).unwrap();
        }
    }
}
