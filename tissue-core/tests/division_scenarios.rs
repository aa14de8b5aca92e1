use approx::{assert_abs_diff_eq, assert_relative_eq};
use glam::DVec2;
use rand::{SeedableRng, rngs::StdRng};
use tissue_core::{
    Config, DivisionPolicy, Mesh, TissueError,
    error::DegenerateReason,
    generator::{hex_cluster, square_grid},
};

fn unit_square() -> Mesh {
    square_grid(1, 1, 1.0, 1.0).unwrap()
}

/// Every wall a cell lists names that cell on the side the cell walks it.
fn assert_references_consistent(mesh: &Mesh) {
    for cell in mesh.cells() {
        let b = cell.boundary();
        for (k, entry) in b.iter().enumerate() {
            let next = b[(k + 1) % b.len()].node;
            let wall = mesh.wall(entry.wall).unwrap();
            assert!(wall.touches(cell.id), "wall {} misses cell {}", wall.id, cell.id);
            assert_eq!(wall.oriented_for(cell.id), Some((entry.node, next)));
        }
    }
    for wall in mesh.walls() {
        for c in [wall.c1, wall.c2].into_iter().flatten() {
            assert!(mesh.cell(c).unwrap().walls().any(|w| w == wall.id));
        }
    }
}

#[test]
fn square_split_down_the_middle() {
    let mut mesh = unit_square();
    let div = mesh
        .divide_over_axis(0, DVec2::new(0.0, 1.0), &Config::default())
        .unwrap();

    for id in [div.daughter1, div.daughter2] {
        let cell = mesh.cell(id).unwrap();
        assert_relative_eq!(cell.area, 0.5, epsilon = 1e-12);
        assert_eq!(cell.walls().count(), 4);
    }

    let wall = mesh.wall(div.dividing_wall).unwrap();
    let a = mesh.node(wall.n1).unwrap().pos;
    let b = mesh.node(wall.n2).unwrap().pos;
    assert_abs_diff_eq!(a.x, 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(b.x, 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!((a.y - b.y).abs(), 1.0, epsilon = 1e-12);
    assert_eq!(wall.cell_count(), 2);
    assert_references_consistent(&mesh);
}

#[test]
fn area_is_conserved_across_many_divisions() {
    let mut mesh = hex_cluster(2, 1.0, 1.0).unwrap();
    let total = mesh.total_area();
    let cfg = Config::default();
    let mut rng = StdRng::seed_from_u64(2024);

    for round in 0..3 {
        for id in mesh.cell_ids() {
            let policy = if round % 2 == 0 {
                DivisionPolicy::Random
            } else {
                DivisionPolicy::ShortAxis
            };
            mesh.cell_mut(id).unwrap().division_policy = policy;
            let before = mesh.cell_area(id).unwrap();
            match mesh.divide(id, &mut rng, None, &cfg) {
                Ok(Some(div)) => {
                    let after = mesh.cell_area(div.daughter1).unwrap()
                        + mesh.cell_area(div.daughter2).unwrap();
                    assert_relative_eq!(before, after, epsilon = 1e-9);
                }
                Ok(None) => panic!("policy {policy:?} should divide"),
                Err(e) => assert!(e.is_recoverable(), "{e}"),
            }
        }
    }

    assert!(mesh.n_cells() > 19 * 4);
    assert_relative_eq!(mesh.total_area(), total, epsilon = 1e-9);
    mesh.validate().unwrap();
    assert_references_consistent(&mesh);
}

#[test]
fn degenerate_lines_leave_the_mesh_alone() {
    let positions = vec![
        DVec2::new(0.0, 0.0),
        DVec2::new(2.0, 0.0),
        DVec2::new(0.0, 2.0),
    ];
    let mut mesh = Mesh::from_polygons(&positions, &[vec![0, 1, 2]], 1.0).unwrap();
    let before = mesh.snapshot();
    let cfg = Config::default();

    // Along an edge.
    let err = mesh
        .divide_over_given_line(0, DVec2::ZERO, DVec2::new(1.0, 0.0), false, None, &cfg)
        .unwrap_err();
    assert!(matches!(err, TissueError::DegenerateDivision { cell: 0, .. }));
    assert!(err.is_recoverable());

    // Entirely outside.
    let err = mesh
        .divide_over_given_line(0, DVec2::new(5.0, 5.0), DVec2::new(6.0, 5.0), false, None, &cfg)
        .unwrap_err();
    assert!(matches!(
        err,
        TissueError::DegenerateDivision {
            reason: DegenerateReason::CrossingCount(0),
            ..
        }
    ));

    assert_eq!(mesh.snapshot(), before);
    assert_eq!(mesh.n_cells(), 1);
    assert_eq!(mesh.n_walls(), 3);
    assert_eq!(mesh.n_nodes(), 3);
}

#[test]
fn apoptosis_with_a_single_neighbor() {
    let mut mesh = square_grid(2, 1, 1.0, 1.0).unwrap();
    let cycle_before = mesh.cell(1).unwrap().boundary().to_vec();
    let neighbors = mesh.apoptose(0).unwrap();
    assert_eq!(neighbors, vec![1]);

    assert_eq!(mesh.n_cells(), 1);
    assert!(mesh.cell(0).is_err());
    assert!(mesh.neighbor_indices(1).unwrap().is_empty());
    assert!(mesh.at_boundary(1).unwrap());
    assert_eq!(mesh.cell(1).unwrap().boundary(), cycle_before.as_slice());
    // The shared wall survives as tissue edge; the dead cell's own walls do not.
    assert_eq!(mesh.n_walls(), 4);
    assert_eq!(mesh.n_nodes(), 4);
    assert!(mesh.nodes().all(|n| n.boundary));
    mesh.validate().unwrap();
    assert_references_consistent(&mesh);

    // Ids are not reused.
    let div = mesh.divide_over_axis(1, DVec2::Y, &Config::default()).unwrap();
    assert_eq!(div.daughter2, 2);
}

#[test]
fn hex_centre_has_six_neighbors() {
    let mesh = hex_cluster(1, 1.0, 1.0).unwrap();
    let mut n = mesh.neighbor_indices(0).unwrap();
    assert_eq!(n.len(), 6);

    // Listed in cycle order: each neighbor meets the next one, wrapping
    // around, at a corner of the centre cell.
    let centre: Vec<_> = mesh.cell(0).unwrap().nodes().collect();
    for k in 0..n.len() {
        let a: Vec<_> = mesh.cell(n[k]).unwrap().nodes().collect();
        let b: Vec<_> = mesh.cell(n[(k + 1) % n.len()]).unwrap().nodes().collect();
        assert!(
            centre.iter().any(|v| a.contains(v) && b.contains(v)),
            "neighbors {} and {} are not adjacent around cell 0",
            n[k],
            n[(k + 1) % n.len()]
        );
    }

    n.sort_unstable();
    n.dedup();
    assert_eq!(n, vec![1, 2, 3, 4, 5, 6]);
    assert!(!mesh.at_boundary(0).unwrap());
    for id in 1..7 {
        assert!(mesh.at_boundary(id).unwrap());
    }
}

#[test]
fn neighbor_queries_are_stable() {
    let mut mesh = hex_cluster(2, 1.0, 1.0).unwrap();
    mesh.divide_over_axis(0, DVec2::X, &Config::default()).unwrap();
    for id in mesh.cell_ids() {
        let first = mesh.neighbor_indices(id).unwrap();
        let second = mesh.neighbor_indices(id).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn unrecognized_policy_divides_over_short_axis() {
    let positions = vec![
        DVec2::new(0.0, 0.0),
        DVec2::new(3.0, 0.0),
        DVec2::new(3.0, 1.0),
        DVec2::new(0.0, 1.0),
    ];
    let mut mesh = Mesh::from_polygons(&positions, &[vec![0, 1, 2, 3]], 1.0).unwrap();
    mesh.cell_mut(0).unwrap().division_policy = DivisionPolicy::from_code(12);
    let mut rng = StdRng::seed_from_u64(0);
    let div = mesh
        .divide(0, &mut rng, None, &Config::default())
        .unwrap()
        .unwrap();

    assert_eq!(div.policy_fallback, Some(DivisionPolicy::Unrecognized(12)));
    assert_relative_eq!(mesh.cell(div.daughter1).unwrap().area, 1.5, epsilon = 1e-9);
    assert_relative_eq!(mesh.cell(div.daughter2).unwrap().area, 1.5, epsilon = 1e-9);
}

#[test]
fn shared_wall_division_keeps_neighbor_consistent() {
    let mut mesh = square_grid(3, 3, 1.0, 1.0).unwrap();
    // A horizontal cut through the centre cell splits its side walls,
    // which it shares with cells 3 and 5.
    let div = mesh
        .divide_over_axis(4, DVec2::X, &Config::default())
        .unwrap();
    for side in [3, 5] {
        assert_eq!(mesh.cell(side).unwrap().n_nodes(), 5);
        let mut n = mesh.neighbor_indices(side).unwrap();
        n.sort_unstable();
        assert!(n.contains(&div.daughter1));
        assert!(n.contains(&div.daughter2));
    }
    mesh.validate().unwrap();
    assert_references_consistent(&mesh);
}
