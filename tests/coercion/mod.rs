// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::{bail, Result};
use replica::unstable::{convert_complex, convert_float};
use replica::*;
use serde::Deserialize;
use test_generator::test_resources;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    from: Kind,
    to: Kind,
    value: serde_yaml::Value,
    // Absent when the destination is expected to keep its zero value.
    want: Option<serde_yaml::Value>,
    #[serde(default)]
    flags: Flags,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn make_value(kind: Kind, v: &serde_yaml::Value) -> Result<Value> {
    let Some(ty) = TypeId::basic(kind) else {
        bail!("{kind} is not a basic kind");
    };
    let data = match (kind.class(), v) {
        (KindClass::Boolean, serde_yaml::Value::Bool(b)) => Data::Bool(*b),
        (KindClass::Text, serde_yaml::Value::String(s)) => Data::String(s.as_str().into()),
        (KindClass::SignedInteger, serde_yaml::Value::Number(n)) => match n.as_i64() {
            Some(n) => Data::Int(n),
            None => bail!("{n} is not a signed integer"),
        },
        (KindClass::UnsignedInteger, serde_yaml::Value::Number(n)) => match n.as_u64() {
            Some(n) => Data::Uint(n),
            None => bail!("{n} is not an unsigned integer"),
        },
        (KindClass::FloatingPoint, serde_yaml::Value::Number(n)) => match n.as_f64() {
            Some(n) => Data::Float(convert_float(n, kind)),
            None => bail!("{n} is not a float"),
        },
        // Complex numbers are written as [re, im].
        (KindClass::Complex, serde_yaml::Value::Sequence(parts)) => {
            let parts: Vec<f64> = parts.iter().filter_map(serde_yaml::Value::as_f64).collect();
            let [re, im] = parts[..] else {
                bail!("{v:?} is not a complex number");
            };
            Data::Complex(convert_complex(Complex::new(re, im), kind))
        }
        _ if kind == Kind::Uintptr => match v.as_u64().and_then(|n| usize::try_from(n).ok()) {
            Some(n) => Data::Uintptr(n),
            None => bail!("{v:?} is not an address"),
        },
        _ => bail!("cannot build a {kind} from {v:?}"),
    };
    Ok(Value::from_parts(ty, data))
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("running {file}");
    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    for case in &test.cases {
        print!("case {} ", case.note);
        let Some(to) = TypeId::basic(case.to) else {
            bail!("{} is not a basic kind", case.to);
        };
        let src = make_value(case.from, &case.value)?;

        let mut store = Store::new();
        let dst = store.alloc_zeroed(to)?;
        deep_copy(&mut store, &dst, &src, &[case.flags])?;

        let expected = match &case.want {
            Some(want) => make_value(case.to, want)?,
            None => store.types().zero(to)?,
        };
        let actual = store.load(&dst).cloned().unwrap_or_default();
        if actual != expected {
            bail!(
                "{}: {:?} -> {}: expected {:?}, got {:?}",
                case.note,
                case.value,
                case.to,
                expected,
                actual
            );
        }
        println!("passed");
    }
    println!("{} cases passed.", test.cases.len());
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/coercion/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
