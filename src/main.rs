mod args;

use anyhow::{bail, Context, Result};
use args::{Cli, Command, GenerateArgs, ScanArgs};
use clap::Parser;
use qr_studio::config::{ConfigModel, StudioConfig};
use qr_studio::scan::{
    FrameScanner, ScanKind, ScanSession, Scanner, ScannerOptions, SystemClipboard,
    SystemNavigator, REDIRECT_DELAY,
};
use qr_studio::{export, Compositor, QrEngine, StyledEngine};
use std::io;
use std::sync::Arc;

const GENERATE_FAILED: &str = "an error occurred while generating the image";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => generate(args).await,
        Command::Scan(args) => scan(args).await,
    }
}

async fn generate(args: GenerateArgs) -> Result<()> {
    let config = StudioConfig::load(args.config.as_deref()).context("Failed to load config")?;
    let mut model = ConfigModel::new(config);
    args.apply(&mut model);

    model.current().validate().context("Invalid configuration")?;
    let mut config = model.current().clone();
    config.clamp_to_ranges();
    let snapshot = Arc::new(config);

    println!("Generating QR code for: {}", snapshot.data);
    let engine = StyledEngine::create(Arc::clone(&snapshot), args.error_correction.into())
        .await
        .context(GENERATE_FAILED)?;

    if args.preview {
        engine
            .render_into(&mut io::stdout().lock())
            .context("Failed to print preview")?;
    }

    let compositor = Compositor::new(args.path_strategy);
    let path = export(&engine, &snapshot, &compositor, args.output.as_deref())
        .await
        .context(GENERATE_FAILED)?;

    println!("Saved to: {}", path.display());
    Ok(())
}

async fn scan(args: ScanArgs) -> Result<()> {
    let engine = if args.camera_frames {
        FrameScanner::camera_frames(args.paths)
    } else {
        FrameScanner::files(args.paths)
    };
    let options = ScannerOptions {
        fps: args.fps,
        ..ScannerOptions::default()
    };
    let mut scanner = Scanner::open(engine, options)
        .await
        .context("Failed to start scanner")?;

    let mut session = ScanSession::new(Arc::new(SystemNavigator));
    session.set_auto_redirect(!args.no_auto_open);

    let mut found = 0usize;
    while let Some(text) = scanner.next_result().await? {
        found += 1;
        session.on_scan(text.as_str());
        let label = match session.kind() {
            Some(ScanKind::Url) => "link",
            _ => "text",
        };
        println!("Scanned {}: {}", label, text);

        if args.copy {
            session
                .copy(&SystemClipboard)
                .context("Failed to copy to clipboard")?;
            println!("Copied to clipboard");
        }
        if args.open {
            session.open_link().context("Failed to open link")?;
        }

        if session.redirect_pending() {
            println!(
                "Opening link in {}s, press Ctrl-C to cancel",
                REDIRECT_DELAY.as_secs()
            );
            let cancelled = tokio::select! {
                _ = session.wait_redirect() => false,
                _ = tokio::signal::ctrl_c() => true,
            };
            if cancelled {
                println!("Redirect cancelled");
                break;
            }
        }

        if !args.continuous {
            break;
        }
        session.reset();
        scanner.resume().await?;
    }
    scanner.close();

    if found == 0 {
        bail!("No QR code found");
    }
    Ok(())
}
