use approx::assert_relative_eq;
use crux_aruco::{builtins, draw_marker};
use crux_core::{GrayImage, RasterView};
use crux_marker::{CalibrateError, MarkerCalibrator, MarkerSpec};
use nalgebra::Point2;

const W: usize = 1216;
const H: usize = 800;

fn canvas() -> GrayImage {
    GrayImage::filled(W, H, 255)
}

fn put_marker(img: &mut GrayImage, id: u32, side: usize, x0: usize, y0: usize) {
    let m = draw_marker(&builtins::DICT_4X4_50, id, side, 1).expect("draw");
    img.blit(&m.view(), x0, y0);
}

fn calibrate(img: &GrayImage) -> Result<crux_marker::Marker, CalibrateError> {
    let view = RasterView::gray(img.width, img.height, &img.data);
    MarkerCalibrator::default().calibrate(&view, &MarkerSpec::default())
}

#[test]
fn seven_centimetre_marker_on_wide_canvas() {
    let mut img = canvas();
    put_marker(&mut img, 0, 200, 100, 100);

    let marker = calibrate(&img).expect("calibrated");
    assert_eq!(marker.marker_id(), Some(0));
    assert_eq!(marker.width_cm().round(), 7.0);
    assert_eq!(marker.height_cm().round(), 7.0);
    assert_relative_eq!(marker.pixels_per_cm(), 796.0 / 28.0, max_relative = 0.02);
    assert!(marker.pixels_per_cm() > 0.0);

    let c = marker.center_px();
    assert!((c.x - 199.5).abs() < 2.0 && (c.y - 199.5).abs() < 2.0, "{c:?}");
}

#[test]
fn marker_in_the_corner_is_found_through_padding() {
    let mut img = canvas();
    put_marker(&mut img, 0, 200, 0, 0);

    let marker = calibrate(&img).expect("calibrated");
    assert_eq!(marker.marker_id(), Some(0));
    let tl = marker.corners()[0];
    assert!(tl.x.abs() <= 1.0 && tl.y.abs() <= 1.0, "{tl:?}");
    assert_eq!(marker.width_cm().round(), 7.0);
    assert_relative_eq!(marker.pixels_per_cm(), 796.0 / 28.0, max_relative = 0.02);
}

#[test]
fn blank_image_reports_marker_not_found() {
    let img = canvas();
    assert!(matches!(
        calibrate(&img),
        Err(CalibrateError::MarkerNotFound { .. })
    ));
}

#[test]
fn largest_marker_is_selected() {
    let mut img = canvas();
    put_marker(&mut img, 5, 120, 700, 300);
    put_marker(&mut img, 9, 200, 100, 400);
    put_marker(&mut img, 2, 90, 950, 80);

    let marker = calibrate(&img).expect("calibrated");
    assert_eq!(marker.marker_id(), Some(9));
}

#[test]
fn quarter_turned_marker_reports_orientation() {
    let n = 180;
    let m = draw_marker(&builtins::DICT_4X4_50, 21, n, 1).expect("draw");
    let mut turned = GrayImage::filled(n, n, 255);
    for y in 0..n {
        for x in 0..n {
            turned.data[y * n + x] = m.data[(n - 1 - x) * n + y];
        }
    }
    let mut img = canvas();
    img.blit(&turned.view(), 500, 300);

    let marker = calibrate(&img).expect("calibrated");
    assert_eq!(marker.marker_id(), Some(21));
    assert_relative_eq!(
        marker.orientation_rad(),
        std::f32::consts::FRAC_PI_2,
        epsilon = 0.05
    );
    // printed top-left sits at the image top-right
    let tl = marker.corners()[0];
    assert!((tl - Point2::new(679.0, 300.0)).norm() < 3.0, "{tl:?}");
}

#[test]
fn rgb_input_is_converted() {
    let mut gray = canvas();
    put_marker(&mut gray, 3, 160, 400, 200);
    let rgb: Vec<u8> = gray.data.iter().flat_map(|&v| [v, v, v]).collect();

    let view = RasterView::rgb(W, H, &rgb);
    let spec = MarkerSpec {
        dictionary: "DICT_4X4_100".into(),
        perimeter_cm: 40.0,
    };
    let marker = MarkerCalibrator::default()
        .calibrate(&view, &spec)
        .expect("calibrated");
    assert_eq!(marker.marker_id(), Some(3));
    assert_eq!(marker.width_cm().round(), 10.0);
}

fn light_ramp(img: &mut GrayImage, left_gain: f32) {
    for y in 0..H {
        for x in 0..W {
            let gain = left_gain + (1.0 - left_gain) * x as f32 / (W - 1) as f32;
            let v = &mut img.data[y * W + x];
            *v = (f32::from(*v) * gain) as u8;
        }
    }
}

#[test]
fn marker_on_the_dim_side_of_a_lighting_ramp() {
    for left_gain in [0.5, 0.4] {
        let mut img = canvas();
        put_marker(&mut img, 0, 200, 150, 300);
        light_ramp(&mut img, left_gain);

        let marker = calibrate(&img).expect("calibrated under uneven lighting");
        assert_eq!(marker.marker_id(), Some(0), "gain {left_gain}");
        assert_eq!(marker.width_cm().round(), 7.0, "gain {left_gain}");
        assert_relative_eq!(marker.pixels_per_cm(), 796.0 / 28.0, max_relative = 0.02);
    }
}
