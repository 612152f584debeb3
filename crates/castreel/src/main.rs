mod app;

use anyhow::Result;

use app::{HeadlessPlayer, PlayerArgs};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = PlayerArgs::parse(std::env::args().skip(1))?;
    let config = app::load_config();
    let scene = app::load_scene(&args, &config)?;

    let mut player = HeadlessPlayer::new(&config, scene, args.paletted);
    player.run(args.ticks);

    Ok(())
}
