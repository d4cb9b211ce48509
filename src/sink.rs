use crate::constants::DATE_FORMAT;
use crate::error::{EssError, Result};
use crate::names::NameResolver;
use crate::protocol::Event;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::io::Write;
use std::sync::Arc;
use strum_macros::{AsRefStr, EnumString};

const RULE_WIDTH: usize = 100;
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ViewerMode {
    EventViewer,
    StateViewer,
}

/// Console sink for `mode`, writing to `out`.
pub fn viewer<W>(
    mode: ViewerMode,
    names: Arc<dyn NameResolver>,
    out: W,
    clear_screen: bool,
) -> Box<dyn EventSink>
where
    W: Write + Send + 'static,
{
    match mode {
        ViewerMode::EventViewer => {
            Box::new(EventViewer::new(names, out).with_clear_screen(clear_screen))
        }
        ViewerMode::StateViewer => {
            Box::new(StateViewer::new(names, out).with_clear_screen(clear_screen))
        }
    }
}

/// Consumer of the event stream.
#[async_trait]
pub trait EventSink: Send {
    /// Called before every connection attempt
    fn on_connecting(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called after a connection failed, before the reconnect backoff
    fn on_disconnected(&mut self, _error: &EssError) -> Result<()> {
        Ok(())
    }

    /// Handle events in receipt order
    async fn process(&mut self, events: &[Event]) -> Result<()>;
}

fn write_header<W: Write>(out: &mut W, clear: bool, columns: [(&str, usize); 3]) -> Result<()> {
    if clear {
        write!(out, "{}", CLEAR_SCREEN)?;
    }
    writeln!(out, "Press Ctrl+C to return")?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    let [(a, wa), (b, wb), (c, wc)] = columns;
    writeln!(out, "{:<wa$} {:<wb$} {:<wc$}", a, b, c)?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    Ok(())
}

fn write_disconnect<W: Write>(out: &mut W, error: &EssError) -> Result<()> {
    writeln!(out, "[!] {}", error)?;
    writeln!(out, "[*] RECONNECTING...")?;
    out.flush()?;
    Ok(())
}

/// Prints one row per event. Keeps no state.
pub struct EventViewer<W: Write + Send> {
    names: Arc<dyn NameResolver>,
    out: W,
    clear_screen: bool,
}

impl<W: Write + Send> EventViewer<W> {
    pub fn new(names: Arc<dyn NameResolver>, out: W) -> Self {
        Self {
            names,
            out,
            clear_screen: false,
        }
    }

    pub fn with_clear_screen(mut self, clear_screen: bool) -> Self {
        self.clear_screen = clear_screen;
        self
    }

    pub fn output(&self) -> &W {
        &self.out
    }
}

#[async_trait]
impl<W: Write + Send> EventSink for EventViewer<W> {
    fn on_connecting(&mut self) -> Result<()> {
        write_header(
            &mut self.out,
            self.clear_screen,
            [("Timestamp", 30), ("Source", 50), ("Event", 30)],
        )
    }

    fn on_disconnected(&mut self, error: &EssError) -> Result<()> {
        write_disconnect(&mut self.out, error)
    }

    async fn process(&mut self, events: &[Event]) -> Result<()> {
        for event in events {
            let source = self.names.source_name(&event.source).await;
            let name = self.names.event_name(&event.event_type).await;
            let timestamp = match event.timestamp() {
                Some(ts) => ts.format(DATE_FORMAT).to_string(),
                None => event.time.clone().unwrap_or_default(),
            };
            writeln!(self.out, "{:<30} {:<50} {:<30}", timestamp, source, name)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Latest event type per (source, state group), in insertion order.
#[derive(Debug, Clone, Default)]
pub struct StateCache {
    sources: IndexMap<String, IndexMap<String, String>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, source: &str, state_group: &str, event_type: &str) {
        self.sources
            .entry(source.to_string())
            .or_default()
            .insert(state_group.to_string(), event_type.to_string());
    }

    /// Fold a stateful event into the table. Events without a state group are ignored.
    pub fn apply(&mut self, event: &Event) -> bool {
        match &event.state_group_id {
            Some(group) => {
                self.update(&event.source, group, &event.event_type);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, source: &str, state_group: &str) -> Option<&str> {
        self.sources
            .get(source)
            .and_then(|groups| groups.get(state_group))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sources.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexMap<String, String>)> {
        self.sources.iter().map(|(source, groups)| (source.as_str(), groups))
    }
}

/// Keeps the latest state per source and state group and redraws the whole
/// table after every batch.
pub struct StateViewer<W: Write + Send> {
    names: Arc<dyn NameResolver>,
    out: W,
    cache: StateCache,
    clear_screen: bool,
}

impl<W: Write + Send> StateViewer<W> {
    pub fn new(names: Arc<dyn NameResolver>, out: W) -> Self {
        Self {
            names,
            out,
            cache: StateCache::new(),
            clear_screen: false,
        }
    }

    pub fn with_clear_screen(mut self, clear_screen: bool) -> Self {
        self.clear_screen = clear_screen;
        self
    }

    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    fn header(&mut self) -> Result<()> {
        write_header(
            &mut self.out,
            self.clear_screen,
            [("Source", 50), ("State group", 30), ("State", 30)],
        )
    }

    async fn render(&mut self) -> Result<()> {
        self.header()?;

        for (source, groups) in self.cache.iter() {
            let mut source_name = self.names.source_name(source).await;
            for (group, event_type) in groups {
                let group_name = self.names.state_group_name(group).await;
                let state = self.names.state_name(event_type).await;
                writeln!(self.out, "{:<50} {:<30} {:<30}", source_name, group_name, state)?;
                source_name.clear();
            }
            writeln!(self.out, "{}", "-".repeat(RULE_WIDTH))?;
        }

        self.out.flush()?;
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send> EventSink for StateViewer<W> {
    fn on_connecting(&mut self) -> Result<()> {
        self.header()
    }

    fn on_disconnected(&mut self, error: &EssError) -> Result<()> {
        write_disconnect(&mut self.out, error)
    }

    async fn process(&mut self, events: &[Event]) -> Result<()> {
        for event in events {
            self.cache.apply(event);
        }
        self.render().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    struct PathNames;

    #[async_trait]
    impl NameResolver for PathNames {
        async fn lookup(&self, resource_path: &str, data_key: &str) -> String {
            let id = resource_path.rsplit('/').next().unwrap_or(resource_path);
            format!("{}:{}", data_key, id)
        }
    }

    fn event(id: &str, source: &str, event_type: &str, group: Option<&str>) -> Event {
        Event {
            id: id.to_string(),
            source: source.to_string(),
            event_type: event_type.to_string(),
            time: Some("2024-03-01T10:15:30.5+00:00".to_string()),
            state_group_id: group.map(str::to_string),
        }
    }

    #[derive(Clone, Default)]
    struct SharedOut(Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for SharedOut {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn text(out: &[u8]) -> String {
        String::from_utf8(out.to_vec()).unwrap()
    }

    #[test]
    fn cache_update_is_idempotent() {
        let mut cache = StateCache::new();
        let e = event("E1", "cameras/C1", "T1", Some("G1"));

        cache.apply(&e);
        cache.apply(&e);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("cameras/C1", "G1"), Some("T1"));
    }

    #[test]
    fn cache_keeps_latest_type_and_insertion_order() {
        let mut cache = StateCache::new();
        cache.update("B", "G2", "T1");
        cache.update("A", "G1", "T1");
        cache.update("B", "G1", "T1");
        cache.update("B", "G2", "T9");

        let order: Vec<(&str, Vec<&str>)> = cache
            .iter()
            .map(|(s, groups)| (s, groups.keys().map(String::as_str).collect()))
            .collect();
        assert_eq!(order, vec![("B", vec!["G2", "G1"]), ("A", vec!["G1"])]);
        assert_eq!(cache.get("B", "G2"), Some("T9"));
    }

    #[test]
    fn stateless_events_do_not_touch_the_cache() {
        let mut cache = StateCache::new();
        assert!(!cache.apply(&event("E1", "C1", "T1", None)));
        assert!(cache.is_empty());
    }

    #[test]
    fn viewer_mode_parses_from_lowercase() {
        assert_eq!(ViewerMode::from_str("stateviewer").unwrap(), ViewerMode::StateViewer);
        assert_eq!(ViewerMode::EventViewer.as_ref(), "eventviewer");
    }

    #[tokio::test]
    async fn mode_selects_the_table_layout() {
        let out = SharedOut::default();
        let mut sink = viewer(ViewerMode::StateViewer, Arc::new(PathNames), out.clone(), false);
        sink.on_connecting().unwrap();
        sink.process(&[event("E1", "cameras/C1", "T1", Some("G1"))])
            .await
            .unwrap();
        let state_out = text(&out.0.lock().unwrap());
        assert!(state_out.contains("State group"));
        assert!(state_out.contains("state:T1"));

        let out = SharedOut::default();
        let mut sink = viewer(ViewerMode::EventViewer, Arc::new(PathNames), out.clone(), false);
        sink.on_connecting().unwrap();
        let event_out = text(&out.0.lock().unwrap());
        assert!(event_out.contains("Timestamp"));
        assert!(!event_out.contains("State group"));
    }

    #[tokio::test]
    async fn event_viewer_prints_resolved_row() {
        let mut viewer = EventViewer::new(Arc::new(PathNames), Vec::new());

        viewer
            .process(&[event("E1", "cameras/C1", "T1", None)])
            .await
            .unwrap();

        let out = text(viewer.output());
        assert!(out.starts_with("2024-03-01 10:15:30"));
        assert!(out.contains("displayName:C1"));
        assert!(out.contains("displayName:T1"));
    }

    #[tokio::test]
    async fn state_viewer_redraws_whole_table() {
        let mut viewer = StateViewer::new(Arc::new(PathNames), Vec::new());

        viewer
            .process(&[
                event("E1", "cameras/C1", "T1", Some("G1")),
                event("E2", "cameras/C1", "T2", Some("G2")),
            ])
            .await
            .unwrap();
        viewer
            .process(&[event("E3", "cameras/C2", "T3", Some("G1"))])
            .await
            .unwrap();

        let out = text(viewer.output());
        let last_table = out.rsplit("State group").next().unwrap();
        let rows: Vec<&str> = last_table
            .lines()
            .filter(|l| l.contains("displayName:G"))
            .collect();

        assert_eq!(rows.len(), 3);
        assert!(rows[0].starts_with("displayName:C1"));
        assert!(rows[0].contains("state:T1"));
        assert!(rows[1].starts_with(' '));
        assert!(rows[1].contains("state:T2"));
        assert!(rows[2].starts_with("displayName:C2"));
    }

    #[tokio::test]
    async fn disconnect_is_reported_to_the_console() {
        let mut viewer = EventViewer::new(Arc::new(PathNames), Vec::new());
        viewer
            .on_disconnected(&EssError::ConnectionError("reset".into()))
            .unwrap();

        let out = text(viewer.output());
        assert!(out.contains("[!] Connection error: reset"));
        assert!(out.contains("RECONNECTING"));
    }
}
