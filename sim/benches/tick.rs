use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use crowd_sim::{find_path, parse_map, Cell, Connectivity, SimConfig, SimWorld};

/// Square city of `blocks` x `blocks` buildings separated by one-cell streets,
/// with a door on the west side of every block.
fn city_map(blocks: usize) -> String {
    let size = blocks * 6 + 1;
    let mut map = String::with_capacity(size * (size + 1));
    for y in 0..size {
        for x in 0..size {
            let symbol = if x % 6 == 0 || y % 6 == 0 {
                'S'
            } else if x % 6 == 1 && y % 6 == 3 {
                'D'
            } else {
                'B'
            };
            map.push(symbol);
        }
        map.push('\n');
    }
    map
}

fn bench_tick(c: &mut Criterion) {
    let map = city_map(12);
    let mut group = c.benchmark_group("crowd_sim/step");

    for &population in &[100usize, 1_000usize] {
        let config = SimConfig {
            population,
            ..Default::default()
        };
        let mut sim = SimWorld::from_map_str(&map, config).expect("bench map is valid");
        sim.run(20);
        group.bench_with_input(BenchmarkId::from_parameter(population), &population, |b, &_n| {
            b.iter(|| {
                sim.step();
                black_box(sim.stats().visible);
            })
        });
    }

    group.finish();
}

fn bench_bfs(c: &mut Criterion) {
    let grid = parse_map(&city_map(12), Connectivity::Eight).expect("bench map is valid");
    let far = Cell::new(grid.width() as i32 - 1, grid.height() as i32 - 1);

    c.bench_function("crowd_sim/find_path_corner_to_corner", |b| {
        b.iter(|| black_box(find_path(&grid, Cell::new(0, 0), far)))
    });
}

criterion_group!(benches, bench_tick, bench_bfs);
criterion_main!(benches);
