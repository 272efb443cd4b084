use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use academy_backend::{
    config::Config,
    database::TenantRegistry,
    external::MailerService,
    handlers,
    services::*,
    swagger::swagger_config,
    tasks,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 连接各租户数据库并执行迁移
    let registry = TenantRegistry::connect(&config)
        .await
        .expect("Failed to connect tenant databases");
    log::info!("{} tenant(s) configured", registry.len());

    // 创建服务
    let notifications: Arc<dyn NotificationSink> = Arc::new(NotificationService::new());
    let activity: Arc<dyn ActivitySink> = Arc::new(ActivityLogService::new());
    let mailer: Arc<dyn EmailSender> = Arc::new(MailerService::new(config.email.clone()));

    let attendance_service = AttendanceService::new(
        notifications,
        activity.clone(),
        mailer,
        config.attendance.low_balance_threshold,
    );
    let freeze_service = FreezeService::new(activity);
    let schedule_service = ScheduleService::new(config.scheduler.days_ahead);

    // 启动后台排课任务
    tasks::spawn_all(
        registry.clone(),
        schedule_service.clone(),
        config.scheduler.clone(),
    );

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let scheduler_config = config.scheduler.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(registry.clone()))
            .app_data(web::Data::new(attendance_service.clone()))
            .app_data(web::Data::new(freeze_service.clone()))
            .app_data(web::Data::new(schedule_service.clone()))
            .app_data(web::Data::new(scheduler_config.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::attendance_config)
                    .configure(handlers::subscription_config)
                    .configure(handlers::schedule_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
