//! Property tests: stock always equals what the recorded history says it is.

use chrono::Utc;
use proptest::prelude::*;

use stockledger_core::{Aggregate, DomainError, MaterialId, ProcessingRecordId, Quantity, RollId, SaleId};
use stockledger_events::execute;

use crate::{Material, MaterialCommand, MaterialDetails, MaterialEvent, ProcessingRecord};

#[derive(Debug, Clone)]
enum Op {
    Sell(i64),
    ReverseSale(usize),
    Send(i64),
    Receive(usize, i64),
    Adjust(i64),
    Rolls(Vec<i64>),
}

/// Mostly everyday amounts, sometimes ones at the edge of `i64`.
fn amount() -> impl Strategy<Value = i64> {
    prop_oneof![
        6 => 1i64..60,
        1 => (i64::MAX - 64)..=i64::MAX,
        1 => (i64::MAX / 2)..=(i64::MAX / 2 + 64),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        amount().prop_map(Op::Sell),
        (0usize..8).prop_map(Op::ReverseSale),
        amount().prop_map(Op::Send),
        (0usize..8, prop_oneof![0i64..40, amount()]).prop_map(|(i, q)| Op::Receive(i, q)),
        prop_oneof![-30i64..30, amount(), amount().prop_map(|a| -a)].prop_map(Op::Adjust),
        prop::collection::vec(amount(), 1..4).prop_map(Op::Rolls),
    ]
}

fn q(v: i64) -> Quantity {
    Quantity::non_negative(v).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    /// Property: after any sequence of operations, including amounts near
    /// `i64::MAX`, quantity-on-hand equals initial stock + adjustments + rolls
    /// − live sales − outstanding processing, is never negative, and replaying
    /// the emitted events on a fresh aggregate reproduces the same state.
    #[test]
    fn quantity_on_hand_matches_history(
        initial in prop_oneof![0i64..100, (i64::MAX - 100)..=i64::MAX],
        ops in prop::collection::vec(op(), 1..40)
    ) {
        let id = MaterialId::new();
        let now = Utc::now();
        let mut material = Material::empty(id);
        let mut history: Vec<MaterialEvent> = Vec::new();

        let register = MaterialCommand::Register {
            material_id: id,
            details: MaterialDetails { name: "Denim".to_string(), ..MaterialDetails::default() },
            occurred_at: now,
        };
        history.extend(execute(&mut material, &register).unwrap());
        if initial > 0 {
            let cmd = MaterialCommand::AdjustStock { material_id: id, delta: initial, reason: None, occurred_at: now };
            history.extend(execute(&mut material, &cmd).unwrap());
        }

        // Model sums run wide so they cannot overflow themselves.
        let mut credited = i128::from(initial);
        let mut live_sales: Vec<(SaleId, Quantity)> = Vec::new();
        let mut records: Vec<ProcessingRecord> = Vec::new();

        for op in ops {
            let before = material.clone();
            let result = match op {
                Op::Sell(n) => {
                    let sale_id = SaleId::new();
                    let r = execute(&mut material, &MaterialCommand::RecordSale {
                        material_id: id, sale_id, quantity: q(n), occurred_at: now,
                    });
                    if r.is_ok() { live_sales.push((sale_id, q(n))); }
                    r
                }
                Op::ReverseSale(i) => {
                    if live_sales.is_empty() { continue; }
                    let (sale_id, quantity) = live_sales.remove(i % live_sales.len());
                    execute(&mut material, &MaterialCommand::ReverseSale {
                        material_id: id, sale_id, quantity, occurred_at: now,
                    })
                }
                Op::Send(n) => {
                    let record_id = ProcessingRecordId::new();
                    let r = execute(&mut material, &MaterialCommand::SendForProcessing {
                        material_id: id, record_id, quantity: q(n), occurred_at: now,
                    });
                    if r.is_ok() {
                        records.push(ProcessingRecord::send(record_id, id, q(n), None, now).unwrap());
                    }
                    r
                }
                Op::Receive(i, n) => {
                    if records.is_empty() { continue; }
                    let idx = i % records.len();
                    match records[idx].receive(q(n), now) {
                        Ok(updated) => {
                            let r = execute(&mut material, &MaterialCommand::ReturnFromProcessing {
                                material_id: id, record_id: updated.id, quantity: q(n), occurred_at: now,
                            });
                            if r.is_ok() { records[idx] = updated; }
                            r
                        }
                        Err(_) => continue,
                    }
                }
                Op::Adjust(delta) => {
                    let r = execute(&mut material, &MaterialCommand::AdjustStock {
                        material_id: id, delta, reason: None, occurred_at: now,
                    });
                    if r.is_ok() { credited += i128::from(delta); }
                    r
                }
                Op::Rolls(sizes) => {
                    let rolls: Vec<(RollId, Quantity)> = sizes.iter().map(|s| (RollId::new(), q(*s))).collect();
                    let r = execute(&mut material, &MaterialCommand::ReceiveRolls {
                        material_id: id, rolls, occurred_at: now,
                    });
                    if r.is_ok() { credited += sizes.iter().map(|s| i128::from(*s)).sum::<i128>(); }
                    r
                }
            };

            match result {
                Ok(events) => history.extend(events),
                Err(err) => {
                    prop_assert!(
                        matches!(err, DomainError::InsufficientStock { .. } | DomainError::InvalidQuantity { .. }),
                        "unexpected rejection: {:?}", err
                    );
                    prop_assert_eq!(&material, &before);
                }
            }
        }

        let sold: i128 = live_sales.iter().map(|(_, q)| i128::from(q.value())).sum();
        let outstanding: i128 = records.iter().map(|r| i128::from(r.outstanding().value())).sum();
        let on_hand = i128::from(material.quantity_on_hand().value());

        prop_assert!(on_hand >= 0);
        prop_assert_eq!(on_hand, credited - sold - outstanding);

        let mut replayed = Material::empty(id);
        for ev in &history {
            replayed.apply(ev);
        }
        prop_assert_eq!(replayed, material);
    }

    /// Property: recording a sale and reversing it restores stock exactly.
    #[test]
    fn sale_then_reversal_round_trips(stock in 1i64..500, pick in 1i64..500) {
        let id = MaterialId::new();
        let now = Utc::now();
        let mut material = Material::empty(id);
        execute(&mut material, &MaterialCommand::Register {
            material_id: id,
            details: MaterialDetails { name: "Linen".to_string(), ..MaterialDetails::default() },
            occurred_at: now,
        }).unwrap();
        execute(&mut material, &MaterialCommand::AdjustStock { material_id: id, delta: stock, reason: None, occurred_at: now }).unwrap();

        let quantity = q(1 + (pick - 1) % stock);
        let sale_id = SaleId::new();
        execute(&mut material, &MaterialCommand::RecordSale { material_id: id, sale_id, quantity, occurred_at: now }).unwrap();
        execute(&mut material, &MaterialCommand::ReverseSale { material_id: id, sale_id, quantity, occurred_at: now }).unwrap();

        prop_assert_eq!(material.quantity_on_hand().value(), stock);
    }
}
