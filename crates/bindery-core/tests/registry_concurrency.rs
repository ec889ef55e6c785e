//! Integration tests: one registry shared across threads.

use bindery_core::{
    Capability, CapabilityList, ReadVisitor, Record, SchemaBuilder, SchemaError, SchemaRegistry,
    Traversal, TraverseError, ValueRef,
};
use std::sync::{Arc, Barrier};
use std::thread;

#[derive(Debug, Default)]
struct Order {
    id: String,
    count: i64,
    line: Line,
}

#[derive(Debug, Default)]
struct Line {
    sku: String,
    qty: i32,
}

impl Record for Line {
    const NAME: &'static str = "Line";

    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema
            .field("sku", |l| &l.sku, |l, v| l.sku = v)
            .field("qty", |l| &l.qty, |l, v| l.qty = v);
    }
}

impl Record for Order {
    const NAME: &'static str = "Order";

    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema
            .field("id", |o| &o.id, |o, v| o.id = v)
            .field("count", |o| &o.count, |o, v| o.count = v)
            .nested("line", |o| &o.line, |o| &mut o.line);
    }
}

const TRACE: CapabilityList = CapabilityList::new("trace", &[Capability::Json]);

#[derive(Default)]
struct Names(Vec<String>);

impl ReadVisitor for Names {
    fn capability(&self) -> Capability {
        Capability::Json
    }

    fn begin_record(&mut self) -> Result<(), TraverseError> {
        self.0.push("{".to_string());
        Ok(())
    }

    fn visit_scalar(&mut self, name: &str, value: ValueRef<'_>) -> Result<(), TraverseError> {
        self.0.push(format!("{name}={}", value.to_value().tag()));
        Ok(())
    }

    fn visit_nested(&mut self, name: &str) -> Result<(), TraverseError> {
        self.0.push(name.to_string());
        Ok(())
    }

    fn end_record(&mut self) -> Result<(), TraverseError> {
        self.0.push("}".to_string());
        Ok(())
    }
}

#[test]
fn racing_threads_observe_one_schema() {
    let registry = Arc::new(SchemaRegistry::new());
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.schema::<Order>().expect("describe")
            })
        })
        .collect();
    let schemas: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread should finish"))
        .collect();

    let latest = registry.schema::<Order>().expect("describe");
    for schema in &schemas {
        assert!(Arc::ptr_eq(schema, &latest));
    }
    assert_eq!(latest.field_names(), vec!["id", "count", "line"]);
}

#[test]
fn concurrent_walks_produce_identical_hook_sequences() {
    let registry = SchemaRegistry::new();
    registry.register::<Order>().expect("register");
    registry.seal();

    let walk = |order: &Order| {
        let mut names = Names::default();
        Traversal::new(&registry, "trace", TRACE)
            .read(order, &mut [&mut names])
            .expect("walk");
        names.0
    };
    let expected = walk(&Order::default());

    let results: Vec<Vec<String>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let walk = &walk;
                scope.spawn(move || {
                    let order = Order {
                        id: format!("o-{i}"),
                        count: i,
                        line: Line {
                            sku: "sku".to_string(),
                            qty: 1,
                        },
                    };
                    walk(&order)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread should finish"))
            .collect()
    });

    for result in results {
        assert_eq!(result, expected);
    }
}

#[test]
fn sealed_registry_reports_unregistered_nested_types() {
    #[derive(Debug, Default)]
    struct Wrapper {
        order: Order,
    }

    impl Record for Wrapper {
        const NAME: &'static str = "Wrapper";

        fn describe(schema: &mut SchemaBuilder<Self>) {
            schema.nested("order", |w| &w.order, |w| &mut w.order);
        }
    }

    let registry = SchemaRegistry::new();
    registry.schema::<Wrapper>().expect("describe outer only");
    registry.seal();

    let err = Traversal::new(&registry, "trace", TRACE)
        .read(&Wrapper::default(), &mut [&mut Names::default()])
        .expect_err("nested type was never described");
    assert!(matches!(
        err,
        TraverseError::Schema(SchemaError::UnknownRecord { record: "Order" })
    ));
}
