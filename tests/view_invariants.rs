use coverage_editor::view::ViewTransform;
use coverage_editor::Point;

fn approx_eq(a: Point, b: Point, tolerance: f64) -> bool {
    (a.x - b.x).abs() <= tolerance && (a.y - b.y).abs() <= tolerance
}

#[test]
fn world_point_under_focal_is_fixed_by_zoom() {
    let focals = [
        Point::new(0.0, 0.0),
        Point::new(320.0, 200.0),
        Point::new(-45.5, 1234.25),
    ];
    let factors = [1.1, 0.5, 3.0, 1.0 / 1.1];

    for focal in focals {
        let mut view = ViewTransform::new(0.1, 10.0);
        view.pan_by(Point::new(17.0, -9.0));
        for factor in factors {
            let before = view.screen_to_world(focal);
            view.zoom_at(focal, factor);
            let after = view.screen_to_world(focal);
            assert!(
                approx_eq(before, after, 1e-9),
                "focal {focal:?} factor {factor}: {before:?} != {after:?}"
            );
        }
    }
}

#[test]
fn scale_stays_within_bounds() {
    let mut view = ViewTransform::new(0.1, 10.0);
    for _ in 0..100 {
        view.zoom_at(Point::new(50.0, 50.0), 1.5);
    }
    assert!(view.scale() <= 10.0);
    for _ in 0..200 {
        view.zoom_at(Point::new(50.0, 50.0), 0.5);
    }
    assert!(view.scale() >= 0.1);
}

#[test]
fn screen_and_world_round_trip() {
    let mut view = ViewTransform::new(0.1, 10.0);
    view.zoom_at(Point::new(100.0, 80.0), 2.5);
    view.pan_by(Point::new(-30.0, 12.0));
    let world = Point::new(42.0, -7.5);
    let back = view.screen_to_world(view.world_to_screen(world));
    assert!(approx_eq(world, back, 1e-9));
}

#[test]
fn drag_moves_world_under_cursor() {
    let mut view = ViewTransform::new(0.1, 10.0);
    view.zoom_at(Point::ZERO, 2.0);
    let grabbed = view.screen_to_world(Point::new(10.0, 10.0));
    view.begin_drag(Point::new(10.0, 10.0));
    view.drag_to(Point::new(60.0, 35.0));
    view.end_drag();
    assert!(approx_eq(view.screen_to_world(Point::new(60.0, 35.0)), grabbed, 1e-9));
    assert!(!view.is_dragging());
}
