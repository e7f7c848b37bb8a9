//! 首页笔记本列表抓取

use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, info};

use crate::discovery::date_label_from_subtitle;
use crate::infrastructure::JsExecutor;
use crate::models::{ItemLocator, ListEntry};

pub(crate) const CARD_SELECTOR: &str = "mat-card.project-button-card";
const TITLE_SELECTOR: &str = "span.project-button-title";
const SUBTITLE_SELECTOR: &str = "div.project-button-subtitle";

const MAX_SCROLLS: usize = 20;
const SCROLL_PAUSE: Duration = Duration::from_millis(800);

#[derive(Debug, Deserialize)]
struct RawCard {
    title: String,
    subtitle: String,
}

/// 滚动加载全部卡片后读取标题和副标题
pub async fn scrape_entries(executor: &JsExecutor) -> Result<Vec<ListEntry>> {
    if let Err(e) = executor
        .wait_for(CARD_SELECTOR, None, Duration::from_secs(15), "等待笔记本列表")
        .await
    {
        debug!("列表为空或加载缓慢: {}", e);
    }
    scroll_to_end(executor).await?;

    let js = format!(
        r#"
        (() => {{
            const cards = [...document.querySelectorAll({card})];
            return cards.map(card => {{
                const title = card.querySelector({title});
                const subtitle = card.querySelector({subtitle});
                return {{
                    title: title ? title.innerText.trim() : '',
                    subtitle: subtitle ? subtitle.innerText.trim() : '',
                }};
            }});
        }})()
        "#,
        card = serde_json::to_string(CARD_SELECTOR)?,
        title = serde_json::to_string(TITLE_SELECTOR)?,
        subtitle = serde_json::to_string(SUBTITLE_SELECTOR)?,
    );
    let cards: Vec<RawCard> = executor.eval_as(js).await?;
    info!("📋 列表中共有 {} 个笔记本", cards.len());
    Ok(into_entries(cards))
}

fn into_entries(cards: Vec<RawCard>) -> Vec<ListEntry> {
    cards
        .into_iter()
        .enumerate()
        .map(|(index, card)| ListEntry {
            date_label: date_label_from_subtitle(&card.subtitle).to_string(),
            title: card.title,
            locator: ItemLocator::ListPosition {
                selector: CARD_SELECTOR.to_string(),
                index,
            },
        })
        .collect()
}

/// 卡片数量不再增长时停止滚动
async fn scroll_to_end(executor: &JsExecutor) -> Result<()> {
    let mut last = executor.count(CARD_SELECTOR).await?;
    for attempt in 0..MAX_SCROLLS {
        executor
            .eval("window.scrollTo(0, document.body.scrollHeight); true")
            .await?;
        tokio::time::sleep(SCROLL_PAUSE).await;
        let current = executor.count(CARD_SELECTOR).await?;
        debug!("滚动 #{}: {} 个卡片", attempt + 1, current);
        if current == last {
            break;
        }
        last = current;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_entries_keeps_positions() {
        let cards = vec![
            RawCard {
                title: "Rust".to_string(),
                subtitle: "Today · 3 sources".to_string(),
            },
            RawCard {
                title: String::new(),
                subtitle: "Jun 28, 2025".to_string(),
            },
        ];
        let entries = into_entries(cards);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date_label, "Today");
        assert_eq!(
            entries[1].locator,
            ItemLocator::ListPosition {
                selector: CARD_SELECTOR.to_string(),
                index: 1
            }
        );
    }
}
