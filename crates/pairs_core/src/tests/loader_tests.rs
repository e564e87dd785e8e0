use super::*;
use axum::{http::StatusCode, routing::get, Router};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use tokio::{net::TcpListener, sync::mpsc};

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).expect("encode png");
    out.into_inner()
}

async fn spawn_image_server() -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let small = png_bytes(3, 2);
    let app = Router::new()
        .route(
            "/images/red.png",
            get(move || {
                let small = small.clone();
                async move { small }
            }),
        )
        .route("/images/garbage.png", get(|| async { "definitely not a png" }))
        .route(
            "/images/missing.png",
            get(|| async { (StatusCode::NOT_FOUND, "") }),
        );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/images/")
}

fn http_loader() -> CardImageLoader {
    CardImageLoader::new(Arc::new(HttpImageSource::new(Client::new())), 64)
}

#[tokio::test]
async fn load_fetches_and_decodes_rgba() {
    let base = spawn_image_server().await;
    let reference = ImageReference::new("red.png", format!("{base}red.png"));

    let image = http_loader().load(&reference).await.expect("decoded");
    assert_eq!((image.width, image.height), (3, 2));
    assert_eq!(image.rgba.len(), 3 * 2 * 4);
    assert_eq!(&image.rgba[..4], &[200, 40, 40, 255]);
}

#[tokio::test]
async fn missing_image_reports_status() {
    let base = spawn_image_server().await;
    let reference = ImageReference::new("missing.png", format!("{base}missing.png"));

    let err = http_loader().load(&reference).await.expect_err("must fail");
    assert_eq!(err, LoadError::Status(404));
}

#[tokio::test]
async fn undecodable_bytes_report_decode_error() {
    let base = spawn_image_server().await;
    let reference = ImageReference::new("garbage.png", format!("{base}garbage.png"));

    let err = http_loader().load(&reference).await.expect_err("must fail");
    assert!(matches!(err, LoadError::Decode(_)), "got {err:?}");
}

#[test]
fn large_images_are_bounded() {
    let image = decode_card_image(&png_bytes(300, 150), 64).expect("decoded");
    assert!(image.width <= 64 && image.height <= 64);
    assert_eq!(image.width, 64);
    assert_eq!(image.rgba.len(), (image.width * image.height * 4) as usize);
}

#[tokio::test]
async fn spawned_loads_report_slot_and_generation() {
    let base = spawn_image_server().await;
    let loader = http_loader();
    let (tx, mut rx) = mpsc::unbounded_channel();

    loader.spawn_load(
        SlotIndex(3),
        Generation(7),
        ImageReference::new("red.png", format!("{base}red.png")),
        tx.clone(),
    );
    loader.spawn_load(
        SlotIndex(4),
        Generation(7),
        ImageReference::new("missing.png", format!("{base}missing.png")),
        tx,
    );

    let mut completions = vec![
        rx.recv().await.expect("first"),
        rx.recv().await.expect("second"),
    ];
    completions.sort_by_key(|completion| completion.slot);

    assert_eq!(completions[0].slot, SlotIndex(3));
    assert_eq!(completions[0].generation, Generation(7));
    assert!(completions[0].result.is_ok());
    assert_eq!(completions[1].slot, SlotIndex(4));
    assert_eq!(completions[1].result, Err(LoadError::Status(404)));
}
