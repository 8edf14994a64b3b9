//! ABI construction from function and event entries.

use ceres::abi::{build_abi, parse_label, AbiEntry, AbiParam};
use ceres::function::{Event, Function};
use std::collections::BTreeMap;

fn function(selector: &str, label: &str, constant: bool, returns: &[&str]) -> (String, Function) {
    (
        selector.to_string(),
        Function {
            selector: selector.to_string(),
            label: label.to_string(),
            constant,
            returns: returns.iter().map(|s| s.to_string()).collect(),
        },
    )
}

fn event(topic: &str, label: &str, indexed_count: usize) -> (String, Event) {
    (topic.to_string(), Event { topic: topic.to_string(), label: label.to_string(), indexed_count })
}

fn param(kind: &str) -> AbiParam {
    AbiParam { name: String::new(), kind: kind.to_string(), indexed: None }
}

#[test]
fn test_function_entry() {
    let functions = BTreeMap::from([function("0x70a08231", "balanceOf(address)", true, &["uint256"])]);
    let abi = build_abi(&functions, &BTreeMap::new());
    assert_eq!(
        abi,
        vec![AbiEntry::Function {
            name: "balanceOf".into(),
            inputs: vec![param("address")],
            outputs: vec![param("uint256")],
            constant: true,
        }]
    );
}

#[test]
fn test_empty_args_give_no_inputs() {
    let functions = BTreeMap::from([function("0x18160ddd", "totalSupply()", true, &[])]);
    let abi = build_abi(&functions, &BTreeMap::new());
    match &abi[0] {
        AbiEntry::Function { inputs, outputs, .. } => {
            assert!(inputs.is_empty());
            assert!(outputs.is_empty());
        }
        other => panic!("unexpected entry {other:?}"),
    }
}

#[test]
fn test_event_indexing() {
    let events = BTreeMap::from([event("0xddf2", "Transfer(address,address,uint256)", 2)]);
    let abi = build_abi(&BTreeMap::new(), &events);
    match &abi[0] {
        AbiEntry::Event { name, inputs, anonymous } => {
            assert_eq!(name, "Transfer");
            assert!(!anonymous);
            let flags: Vec<Option<bool>> = inputs.iter().map(|p| p.indexed).collect();
            assert_eq!(flags, vec![Some(true), Some(true), Some(false)]);
        }
        other => panic!("unexpected entry {other:?}"),
    }
}

#[test]
fn test_bad_labels_skipped() {
    let functions = BTreeMap::from([
        function("0x01", "fallback", false, &[]),
        function("0x02", "ok(uint8)", false, &[]),
    ]);
    let events = BTreeMap::from([event("0x03", "(address)", 0)]);
    let abi = build_abi(&functions, &events);
    assert_eq!(abi.len(), 1);
    assert_eq!(abi[0].name(), "ok");
}

#[test]
fn test_functions_precede_events() {
    let functions = BTreeMap::from([function("0x01", "a()", true, &[])]);
    let events = BTreeMap::from([event("0x00", "E()", 0)]);
    let abi = build_abi(&functions, &events);
    assert!(matches!(abi[0], AbiEntry::Function { .. }));
    assert!(matches!(abi[1], AbiEntry::Event { .. }));
}

#[test]
fn test_json_layout() {
    let functions = BTreeMap::from([function("0x01", "f(uint256)", false, &["bool"])]);
    let json = serde_json::to_value(build_abi(&functions, &BTreeMap::new())).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{
            "type": "function",
            "name": "f",
            "inputs": [{"name": "", "type": "uint256"}],
            "outputs": [{"name": "", "type": "bool"}],
            "constant": false
        }])
    );
}

#[test]
fn test_parse_label_tuple_args() {
    let (name, args) = parse_label("swap((address,uint256)[],bytes)").unwrap();
    assert_eq!(name, "swap");
    assert_eq!(args, vec!["(address,uint256)[]", "bytes"]);
}
