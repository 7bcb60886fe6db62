// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: 共享连接下各仓储的持久化与外部协作方接口
// ==========================================


mod helpers;

use content_pipeline::config::{config_keys, ConfigManager, EngineConfigReader};
use content_pipeline::db::{open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use content_pipeline::domain::filter::{FilterExpression, FilterItem};
use content_pipeline::domain::media::TagValue;
use content_pipeline::engine::sources::{HistoryStore, LibraryProvider, ScheduleStore};
use content_pipeline::logging;
use content_pipeline::repository::{ChannelRepository, MediaRepository};
use helpers::test_data_builder::{posted, ChannelBuilder, MediaBuilder, ScheduleBuilder};
use test_helpers::{create_test_db, create_test_state, ts};

#[tokio::test]
async fn test_app_state_initializes_schema_version() {
    logging::init_test();
    let (_temp_file, state) = create_test_state().unwrap();

    let conn = open_sqlite_connection(&state.db_path).unwrap();
    assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));

    // 重复打开不报错
    let again = content_pipeline::app::AppState::new(state.db_path.clone());
    assert!(again.is_ok());
}

#[tokio::test]
async fn test_media_library_round_trip_through_provider() {
    logging::init_test();
    let (_temp_file, state) = create_test_state().unwrap();

    // 标签按 tag_id 排序读取
    let item = MediaBuilder::new("M1")
        .numeric("t-len", "length", 42.5)
        .tag("t-vip", "audience", "vip")
        .caption("Beach sunset")
        .video()
        .build();
    state.media_repo.upsert(&item).unwrap();
    state.media_repo.upsert(&MediaBuilder::new("M2").build()).unwrap();

    let prefilter = FilterExpression::single(FilterItem::TextSearch {
        value: "sunset".to_string(),
    });
    let library = state.media_repo.load_library(Some(&prefilter)).await.unwrap();
    assert_eq!(library.len(), 2);

    let loaded = library.iter().find(|m| m.id == "M1").unwrap();
    assert_eq!(loaded, &item);
    assert!(loaded
        .values_in("length")
        .any(|v| v.as_numeric() == Some(42.5)));
    assert!(loaded
        .values_in("AUDIENCE")
        .any(|v| v.loosely_equals(&TagValue::Categorical("VIP".to_string()))));
}

#[tokio::test]
async fn test_schedule_store_and_history_store() {
    logging::init_test();
    let (_temp_file, state) = create_test_state().unwrap();

    let filter = FilterExpression::single(FilterItem::ChannelHistory {
        channel_id: "C1".to_string(),
        posted: false,
    });
    state
        .channel_repo
        .upsert_channel(&ChannelBuilder::new("C1").cooldown(24).filter(filter.clone()).build())
        .unwrap();
    state
        .channel_repo
        .upsert_channel(&ChannelBuilder::new("C2").build())
        .unwrap();
    state
        .channel_repo
        .upsert_schedule(
            &ScheduleBuilder::daily("S1", "C1")
                .cadence("weekly")
                .days(&["Tue"])
                .times(&["08:15"])
                .build(),
        )
        .unwrap();

    let ids = state.channel_repo.list_channel_ids().await.unwrap();
    assert_eq!(ids, vec!["C1".to_string(), "C2".to_string()]);

    let channels = state
        .channel_repo
        .load_channels(&["C1".to_string(), "C9".to_string()])
        .await
        .unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].repost_cooldown_hours, 24);
    assert_eq!(channels[0].eligible_media_filter, Some(filter));

    let schedules = state.channel_repo.load_schedules(&ids).await.unwrap();
    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0].preferred_days, vec!["Tue".to_string()]);

    state.history_repo.record(&posted("M1", "C1", ts(1, 8))).unwrap();
    state.history_repo.record(&posted("M2", "C1", ts(5, 8))).unwrap();
    state.history_repo.record(&posted("M3", "C2", ts(5, 9))).unwrap();

    let history = state
        .history_repo
        .load_history(&["C1".to_string()], ts(3, 0))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].media_id, "M2");
}

#[test]
fn test_repositories_open_by_path() {
    let (_temp_file, db_path) = create_test_db().unwrap();

    let media_repo = MediaRepository::new(&db_path).unwrap();
    media_repo.upsert(&MediaBuilder::new("M1").build()).unwrap();

    let channel_repo = ChannelRepository::new(&db_path).unwrap();
    channel_repo
        .upsert_channel(&ChannelBuilder::new("C1").build())
        .unwrap();

    // 独立连接可见已提交数据
    let reopened = MediaRepository::new(&db_path).unwrap();
    assert!(reopened.find_by_id("M1").unwrap().is_some());
    assert_eq!(channel_repo.list_ids().unwrap(), vec!["C1".to_string()]);
}

#[tokio::test]
async fn test_config_overrides_persist_across_instances() {
    let (_temp_file, db_path) = create_test_db().unwrap();

    let config = ConfigManager::new(&db_path).unwrap();
    config
        .set_config_value(config_keys::DRAFT_CONCURRENCY, "8")
        .unwrap();
    config
        .set_config_value(config_keys::HISTORY_LOOKBACK_HOURS, "not-a-number")
        .unwrap();

    let reopened = ConfigManager::new(&db_path).unwrap();
    assert_eq!(reopened.get_draft_concurrency().await.unwrap(), 8);
    // 非法值回退默认
    assert_eq!(reopened.get_history_lookback_hours().await.unwrap(), 720);

    let snapshot: serde_json::Value =
        serde_json::from_str(&reopened.get_config_snapshot().unwrap()).unwrap();
    assert_eq!(snapshot[config_keys::DRAFT_CONCURRENCY], "8");
}
