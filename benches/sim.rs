use circsim::component::{ComponentKind, ComponentParams};
use circsim::kernel::{Kernel, KernelConfig};
use circsim::netlist::{ComponentDescriptor, WireDescriptor};
use criterion::{criterion_group, criterion_main, Criterion};

fn gate(kind: ComponentKind) -> ComponentDescriptor {
    ComponentDescriptor {
        id: None,
        kind,
        params: ComponentParams::default(),
    }
}

fn generate_kernel() -> Kernel {
    use rand::distributions::Uniform;
    use rand::prelude::*;

    let mut rng = StdRng::seed_from_u64(0);
    let kind_dist = Uniform::new(0, 7);

    let mut kernel = Kernel::new(KernelConfig::default());
    let mut outputs = Vec::new();

    for _ in 0..100 {
        let id = kernel.add_gate(gate(ComponentKind::Toggle)).unwrap();
        outputs.push((id, 0u32));
    }

    for _ in 0..100_000 {
        let kind = match kind_dist.sample(&mut rng) {
            0 => ComponentKind::And,
            1 => ComponentKind::Or,
            2 => ComponentKind::Xor,
            3 => ComponentKind::Nand,
            4 => ComponentKind::Nor,
            5 => ComponentKind::Xnor,
            6 => ComponentKind::Not,
            _ => unreachable!(),
        };
        let id = kernel.add_gate(gate(kind)).unwrap();

        let (src_a, port_a) = *outputs.choose(&mut rng).unwrap();
        kernel.add_wire(WireDescriptor {
            id: None,
            source_component: src_a,
            source_port: port_a,
            target_component: id,
            target_port: 0,
        });
        if kind != ComponentKind::Not {
            let (src_b, port_b) = *outputs.choose(&mut rng).unwrap();
            kernel.add_wire(WireDescriptor {
                id: None,
                source_component: src_b,
                source_port: port_b,
                target_component: id,
                target_port: 1,
            });
        }
        outputs.push((id, 0));
    }

    kernel
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("process_one_step", |b| {
        b.iter_batched(
            generate_kernel,
            |mut k| {
                k.step(1_000);
            },
            criterion::BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
