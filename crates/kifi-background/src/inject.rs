use serde_json::{Map, Value};
use tracing::debug;

use kifi_types::TabId;

use crate::context::Background;
use crate::error::BackgroundResult;

fn is_injected(injected: &Map<String, Value>, path: &str) -> bool {
    injected.get(path).and_then(Value::as_bool).unwrap_or(false)
}

impl Background {
    /// Inject `scripts`, their transitive dependencies, and the stylesheets
    /// they need into `tab`. Paths already marked in `injected` are skipped.
    /// Stylesheets go in first. Returns the updated `injected` map.
    pub async fn require(
        &self,
        tab: TabId,
        scripts: &[String],
        mut injected: Map<String, Value>,
    ) -> BackgroundResult<Value> {
        let (scripts, styles) = self.settings().scripts.resolve(scripts);
        for path in styles {
            if is_injected(&injected, &path) {
                continue;
            }
            debug!(%tab, %path, "inserting stylesheet");
            self.platform().insert_css(tab, &path).await?;
            injected.insert(path, Value::Bool(true));
        }
        for path in scripts {
            if is_injected(&injected, &path) {
                continue;
            }
            debug!(%tab, %path, "injecting script");
            self.platform().inject_script(tab, &path).await?;
            injected.insert(path, Value::Bool(true));
        }
        Ok(Value::Object(injected))
    }
}
