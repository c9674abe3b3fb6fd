use std::sync::Arc;

use chrono::Utc;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;

use gemledger_auth::Actor;
use gemledger_core::{AggregateId, TenantId};
use gemledger_events::InMemoryAuditLog;
use gemledger_infra::{
    InMemoryCounterStore, InMemoryDocumentStore, LedgerConfig, SaleOrchestrator, SellRequest,
    UndoRequest,
};
use gemledger_inventory::{InventoryLot, InventoryLotId, Quantity, ShapeName};
use gemledger_sales::{Customer, SaleTransaction, SoldShapeInput};

type Ledger = SaleOrchestrator<
    Arc<InMemoryDocumentStore<InventoryLot>>,
    Arc<InMemoryDocumentStore<SaleTransaction>>,
    Arc<InMemoryCounterStore>,
    Arc<InMemoryAuditLog>,
>;

fn ledger() -> Ledger {
    SaleOrchestrator::new(
        Arc::new(InMemoryDocumentStore::new()),
        Arc::new(InMemoryDocumentStore::new()),
        Arc::new(InMemoryCounterStore::new()),
        Arc::new(InMemoryAuditLog::new()),
        LedgerConfig::default(),
    )
}

fn multi_lot(ledger: &Ledger, admin: &Actor, shapes: usize) -> InventoryLotId {
    let buckets = (0..shapes)
        .map(|i| {
            (
                ShapeName::new(format!("shape-{i}")).unwrap(),
                Quantity::new(1_000_000, Decimal::new(1_000_000, 0)).unwrap(),
            )
        })
        .collect();
    let lot = InventoryLot::new_multi(
        InventoryLotId::new(AggregateId::new()),
        admin.tenant_id,
        format!("BENCH-{shapes}"),
        buckets,
    )
    .unwrap();
    ledger.register_lot(admin, lot).unwrap().id_typed()
}

fn lines(shapes: usize) -> Vec<SoldShapeInput> {
    (0..shapes)
        .map(|i| {
            SoldShapeInput::new(
                Some(ShapeName::new(format!("shape-{i}")).unwrap()),
                Quantity::new(1, Decimal::new(25, 2)).unwrap(),
                Decimal::new(45_000, 0),
            )
        })
        .collect()
}

fn bench_sell_undo_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("sell_undo_round_trip");

    for shapes in [1usize, 4, 16] {
        let ledger = ledger();
        let tenant = TenantId::new();
        let admin = Actor::admin(tenant);
        let lot_id = multi_lot(&ledger, &admin, shapes);
        let requested = lines(shapes);

        group.throughput(Throughput::Elements(shapes as u64));
        group.bench_with_input(BenchmarkId::from_parameter(shapes), &shapes, |b, _| {
            b.iter(|| {
                let sale = ledger
                    .sell(
                        &admin,
                        SellRequest {
                            tenant_id: tenant,
                            lot_id,
                            lines: requested.clone(),
                            customer: Customer::default(),
                            occurred_at: Utc::now(),
                        },
                    )
                    .unwrap();
                let undone = ledger
                    .undo(
                        &admin,
                        UndoRequest {
                            tenant_id: tenant,
                            sale_id: sale.id_typed(),
                            reason: None,
                            occurred_at: Utc::now(),
                        },
                    )
                    .unwrap();
                black_box(undone)
            });
        });
    }

    group.finish();
}

fn bench_rejected_oversell(c: &mut Criterion) {
    let ledger = ledger();
    let tenant = TenantId::new();
    let admin = Actor::admin(tenant);
    let lot_id = multi_lot(&ledger, &admin, 4);
    let mut requested = lines(4);
    requested[3].quantity = Quantity::new(2_000_000, Decimal::ONE).unwrap();

    c.bench_function("rejected_oversell", |b| {
        b.iter(|| {
            let err = ledger
                .sell(
                    &admin,
                    SellRequest {
                        tenant_id: tenant,
                        lot_id,
                        lines: requested.clone(),
                        customer: Customer::default(),
                        occurred_at: Utc::now(),
                    },
                )
                .unwrap_err();
            black_box(err)
        });
    });
}

criterion_group!(benches, bench_sell_undo_round_trip, bench_rejected_oversell);
criterion_main!(benches);
