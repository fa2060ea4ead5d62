use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tokio::signal;
use tracing::{error, info, warn};

mod config;
mod error;
mod events;
mod persistence;
mod services;
mod utils;
mod vision;

use config::Config;
use persistence::{Keybinds, Settings};
use services::{
    create_hotkey_listener, ActionDispatcher, ActionQueue, DetectionLoop, KeyPolicy, KeyPresser,
    LoopTiming, PauseController, SessionContext, VirtualDevice,
};
use vision::{CaptureRegion, PendingDirSink, ScreenFrameSource, TemplateLoader, TemplateMatcher};

#[derive(Parser, Debug)]
#[command(name = "icon-presser")]
#[command(about = "Распознаёт иконку способности на экране и нажимает назначенную ей клавишу")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "icon-presser.toml")]
    config: String,

    /// Класс персонажа (подкаталог каталога способностей)
    #[arg(long)]
    class: Option<String>,

    /// Режим сухого запуска: нажатия только пишутся в лог
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (по умолчанию из конфигурации)
    #[arg(long)]
    log_level: Option<String>,

    /// Показать доступные классы и выйти
    #[arg(long)]
    list_classes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;
    let log_level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(log_level, &config.logging.format)?;

    info!("Запуск icon-presser v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    let spells_dir = config.templates.spells_dir.as_path();
    let classes = TemplateLoader::list_classes(spells_dir)
        .with_context(|| format!("Не удалось прочитать каталог способностей {:?}", spells_dir))?;

    if args.list_classes {
        for class in &classes {
            println!("{}", class);
        }
        return Ok(());
    }

    let class = match args.class.clone().or_else(|| config.templates.class.clone()) {
        Some(class) if classes.contains(&class) => class,
        Some(class) => bail!("Класс '{}' не найден. Доступные: {}", class, classes.join(", ")),
        None => bail!("Класс не выбран (--class). Доступные: {}", classes.join(", ")),
    };
    info!("🎮 Класс: {}", class);

    let input_ok = if args.dry_run {
        warn!("Режим сухого запуска - реальные нажатия отключены");
        true
    } else {
        utils::permissions::check_permissions(config.pause.hotkey_enabled)?
    };

    let settings = Settings::load(&config.templates.settings_path)?;
    let keybinds = Keybinds::load(&config.templates.keybinds_path)?;

    if config.unrecognized.clean_on_start {
        PendingDirSink::clean(&config.unrecognized.pending_dir)?;
    }

    let templates = TemplateLoader::load_class(spells_dir, &class, &keybinds.for_class(&class))?;
    if templates.is_empty() {
        bail!("Для класса '{}' нет ни одного шаблона с назначенной клавишей", class);
    }

    let (x, y) = match settings.overlay_position {
        Some([x, y]) => (x, y),
        None => (config.capture.x, config.capture.y),
    };
    let region = CaptureRegion::new(x, y, config.capture.width, config.capture.height);
    let save_unrecognized = settings.save_unrecognized.unwrap_or(config.unrecognized.save);
    info!(
        "Область захвата: {}, сохранение нераспознанных: {}",
        region,
        if save_unrecognized { "вкл" } else { "выкл" }
    );

    let ctx = Arc::new(SessionContext::new(region));
    let queue = Arc::new(ActionQueue::new());
    let pause = Arc::new(PauseController::new(ctx.clone(), config.pause_debounce()));
    let presser: Arc<dyn KeyPresser> =
        Arc::new(VirtualDevice::new("icon-presser virtual keyboard", args.dry_run)?);
    let dispatcher = ActionDispatcher::new(
        ctx.clone(),
        queue.clone(),
        presser,
        KeyPolicy::from_config(&config.dispatch.key_policy)?,
    );

    let hotkey_listener = if config.pause.hotkey_enabled && !input_ok {
        warn!("Хоткей паузы отключён: нет доступа к устройствам ввода");
        None
    } else if config.pause.hotkey_enabled {
        match create_hotkey_listener(&config.pause, pause.clone(), args.dry_run) {
            Ok(listener) => Some(listener),
            Err(e) => {
                warn!("Хоткей паузы недоступен: {}", e);
                None
            }
        }
    } else {
        None
    };

    ctx.activate();
    info!("Сессия: {}", ctx.state());

    let detection_handle = {
        let ctx = ctx.clone();
        let queue = queue.clone();
        let timing = LoopTiming::from_config(&config);
        let matcher = TemplateMatcher::new(config.matching.threshold);
        let pending_dir = config.unrecognized.pending_dir.clone();
        let class = class.clone();

        thread::Builder::new()
            .name("detection-loop".to_string())
            .spawn(move || {
                let sink = PendingDirSink::new(&pending_dir, &class, save_unrecognized);
                DetectionLoop::new(
                    ctx,
                    queue,
                    Box::new(ScreenFrameSource::new()),
                    Box::new(sink),
                    matcher,
                    templates,
                    timing,
                )
                .run()
            })
            .context("Не удалось запустить поток детекции")?
    };

    let dispatcher_handle = tokio::spawn(dispatcher.run(config.dispatch_tick()));
    let follower_handle = tokio::spawn(follow_overlay_position(
        ctx.clone(),
        config.templates.settings_path.clone(),
    ));

    let hotkey_handle = hotkey_listener.map(|listener| {
        tokio::spawn(async move {
            if let Err(e) = listener.run().await {
                error!("Ошибка в HotkeyListener: {}", e);
            }
        })
    });

    info!("Все сервисы запущены, Ctrl+C для выхода");

    match signal::ctrl_c().await {
        Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
        Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
    }

    info!("Завершение работы...");
    ctx.stop();

    if let Some(handle) = &hotkey_handle {
        handle.abort();
    }
    follower_handle.abort();

    let shutdown_timeout = tokio::time::Duration::from_secs(5);
    let shutdown_result = tokio::time::timeout(shutdown_timeout, async {
        let _ = dispatcher_handle.await;
        if let Some(handle) = hotkey_handle {
            let _ = handle.await;
        }
        match tokio::task::spawn_blocking(move || detection_handle.join()).await {
            Ok(Ok(stats)) => info!("📊 Итог: {}", stats),
            _ => error!("Поток детекции завершился аварийно"),
        }
    })
    .await;

    match shutdown_result {
        Ok(()) => info!("Все сервисы завершили работу корректно"),
        Err(_) => warn!("Таймаут при завершении сервисов"),
    }

    let abandoned = queue.len();
    if abandoned > 0 {
        info!("Брошено действий в очереди: {}", abandoned);
    }

    info!("icon-presser завершил работу");
    Ok(())
}

/// Перечитывать settings.json и сдвигать область вслед за оверлеем
async fn follow_overlay_position(ctx: Arc<SessionContext>, settings_path: PathBuf) {
    let mut ticker = tokio::time::interval(tokio::time::Duration::from_secs(1));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    while ctx.is_running() {
        ticker.tick().await;

        let position = match Settings::read(&settings_path) {
            Ok(settings) => settings.overlay_position,
            Err(e) => {
                debug_if_enabled!("settings.json не прочитан, пропускаем: {}", e);
                continue;
            }
        };
        let Some([x, y]) = position else {
            continue;
        };
        let region = ctx.region();
        if (region.x, region.y) != (x, y) {
            ctx.move_region(x, y);
            info!("📍 Область захвата перемещена: {}", ctx.region());
        }
    }
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let registry = tracing_subscriber::registry().with(filter);

    if format == "full" {
        registry.with(tracing_subscriber::fmt::layer()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().compact()).init();
    }

    Ok(())
}
