// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use std::sync::Arc;

use alloy::primitives::B256;
use hdt_trace_data::{FrameAssembler, TraceRow, TracingSink};
use serde_json::{json, Value};

fn rows() -> Vec<TraceRow> {
    let tx = |n: u8| Some(format!("0x{}", hex::encode([n; 32])));
    vec![
        TraceRow {
            block_number: 100,
            tx_hash: tx(1),
            tx_position: 0,
            from_address: Some(format!("0x{}", "11".repeat(20))),
            to_address: Some(format!("0x{}", "22".repeat(20))),
            trace_type: "call".into(),
            call_type: "call".into(),
            input: "0x".into(),
            output: "0x".into(),
            gas: Some(21_000),
            gas_used: 21_000,
            subtraces: 1,
            trace_address: "[]".into(),
            ..Default::default()
        },
        TraceRow {
            block_number: 100,
            tx_hash: tx(1),
            tx_position: 0,
            trace_type: "call".into(),
            call_type: "staticcall".into(),
            trace_address: "[0]".into(),
            error: "execution reverted".into(),
            output: "0x08c379a0".into(),
            ..Default::default()
        },
        TraceRow {
            block_number: 100,
            tx_hash: tx(2),
            tx_position: 1,
            trace_type: "create".into(),
            trace_address: "[]".into(),
            error: "out of gas".into(),
            ..Default::default()
        },
    ]
}

#[test]
fn block_rows_render_as_parity_traces() {
    let assembler = FrameAssembler::new(Arc::new(TracingSink));
    let frames = assembler.assemble(&rows(), B256::repeat_byte(0xab));
    let value = serde_json::to_value(&frames).unwrap();

    let frames = value.as_array().unwrap();
    assert_eq!(frames.len(), 3);

    assert_eq!(frames[0]["traceAddress"], json!([]));
    assert_eq!(frames[0]["subtraces"], json!(1));
    assert_eq!(frames[0]["action"]["callType"], json!("call"));
    assert_eq!(frames[0]["result"]["gasUsed"], json!("0x5208"));

    assert_eq!(frames[1]["traceAddress"], json!([0]));
    assert_eq!(frames[1]["error"], json!("execution reverted"));
    assert_eq!(frames[1]["result"]["output"], json!("0x08c379a0"));

    assert_eq!(frames[2]["transactionPosition"], json!(1));
    assert_eq!(frames[2]["type"], json!("create"));
    assert_eq!(frames[2].get("result"), None::<&Value>);

    let block_hash = json!(B256::repeat_byte(0xab));
    assert!(frames.iter().all(|f| f["blockHash"] == block_hash));
}
