//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS"和少量页面原语

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::{AppError, BrowserError};

/// 等待类操作的检查间隔
const WAIT_STEP: Duration = Duration::from_millis(500);

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力以及按选择器/文本定位元素的原语
/// - 不认识笔记本、报告
/// - 不处理业务流程
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 执行 JS 代码并返回 JSON 结果
    ///
    /// # 参数
    /// - `js_code`: 要执行的 JavaScript 代码
    ///
    /// # 返回
    /// 返回 JSON 值
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 导航到指定 URL
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|source| BrowserError::NavigationFailed {
                url: url.to_string(),
                source,
            })?;
        debug!("已导航到: {}", url);
        Ok(())
    }

    /// 当前页面地址
    pub async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    /// 是否存在可见的匹配元素
    pub async fn exists(&self, selector: &str, text: Option<&str>) -> Result<bool> {
        let js = format!("({}) !== null", locate_expr(selector, text));
        self.eval_as(js).await
    }

    /// 匹配元素的数量（不要求可见）
    pub async fn count(&self, selector: &str) -> Result<usize> {
        let js = format!("document.querySelectorAll({}).length", js_str(selector));
        self.eval_as(js).await
    }

    /// 点击第一个可见的匹配元素，返回是否点击成功
    pub async fn click(&self, selector: &str, text: Option<&str>) -> Result<bool> {
        let js = format!(
            r#"
            (() => {{
                const el = {locate};
                if (!el) return false;
                el.scrollIntoView({{ block: 'center' }});
                el.click();
                return true;
            }})()
            "#,
            locate = locate_expr(selector, text)
        );
        self.eval_as(js).await
    }

    /// 点击第 `index` 个匹配元素（不要求可见）
    pub async fn click_nth(&self, selector: &str, index: usize) -> Result<bool> {
        let js = format!(
            r#"
            (() => {{
                const el = document.querySelectorAll({selector})[{index}];
                if (!el) return false;
                el.scrollIntoView({{ block: 'center' }});
                el.click();
                return true;
            }})()
            "#,
            selector = js_str(selector),
            index = index
        );
        self.eval_as(js).await
    }

    /// 等待匹配元素出现
    pub async fn wait_for(
        &self,
        selector: &str,
        text: Option<&str>,
        timeout: Duration,
        action: &str,
    ) -> Result<()> {
        let js = format!("({}) !== null", locate_expr(selector, text));
        self.wait_until(&js, timeout, action).await
    }

    /// 等待元素出现后点击
    pub async fn wait_and_click(
        &self,
        selector: &str,
        text: Option<&str>,
        timeout: Duration,
        action: &str,
    ) -> Result<()> {
        self.wait_for(selector, text, timeout, action).await?;
        if !self.click(selector, text).await? {
            return Err(anyhow!("元素在点击前消失: {}", action));
        }
        Ok(())
    }

    /// 轮询 JS 布尔表达式直到为真
    ///
    /// 超时返回 `AppError::Timeout`
    pub async fn wait_until(&self, js_condition: &str, timeout: Duration, action: &str) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.eval_as::<bool>(js_condition.to_string()).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => debug!("等待 '{}' 时执行 JS 出错: {}", action, e),
            }
            if Instant::now() >= deadline {
                return Err(AppError::timeout(action, timeout.as_secs()).into());
            }
            sleep(WAIT_STEP).await;
        }
    }

    /// 填写输入框或文本域
    ///
    /// `append` 为真时追加到已有内容之后
    pub async fn fill(&self, selector: &str, value: &str, append: bool) -> Result<bool> {
        let js = format!(
            r#"
            (() => {{
                const el = {locate};
                if (!el) return false;
                el.focus();
                el.value = {append} ? (el.value || '') + {value} : {value};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()
            "#,
            locate = locate_expr(selector, None),
            append = append,
            value = js_str(value)
        );
        self.eval_as(js).await
    }

    /// 按下回车（作用于当前焦点元素）
    pub async fn press_enter(&self, selector: &str) -> Result<()> {
        let js = format!(
            r#"
            (() => {{
                const el = document.querySelector({selector});
                if (!el) return false;
                for (const type of ['keydown', 'keypress', 'keyup']) {{
                    el.dispatchEvent(new KeyboardEvent(type, {{ key: 'Enter', code: 'Enter', keyCode: 13, bubbles: true }}));
                }}
                el.blur();
                return true;
            }})()
            "#,
            selector = js_str(selector)
        );
        self.eval(js).await?;
        Ok(())
    }

    /// 给文件输入框设置文件
    pub async fn set_input_file(&self, selector: &str, file: &Path) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .with_context(|| format!("找不到文件输入框: {}", selector))?;

        let params = SetFileInputFilesParams::builder()
            .file(file.display().to_string())
            .backend_node_id(element.backend_node_id)
            .build()
            .map_err(|e| anyhow!("构造上传参数失败: {}", e))?;
        self.page.execute(params).await?;
        debug!("已设置上传文件: {}", file.display());
        Ok(())
    }
}

/// 转为 JS 字符串字面量
fn js_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// 查找第一个可见且（可选）包含指定文本的元素的 JS 表达式
///
/// 文本比较不区分大小写
fn locate_expr(selector: &str, text: Option<&str>) -> String {
    let text = match text {
        Some(t) => js_str(&t.to_lowercase()),
        None => "null".to_string(),
    };
    format!(
        r#"(() => {{
            const text = {text};
            const nodes = [...document.querySelectorAll({selector})];
            return nodes.find(el => {{
                const visible = !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);
                if (!visible) return false;
                if (text === null) return true;
                const label = ((el.innerText || '') + ' ' + (el.getAttribute('aria-label') || '')).toLowerCase();
                return label.includes(text);
            }}) || null;
        }})()"#,
        text = text,
        selector = js_str(selector)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_str_escapes_quotes() {
        assert_eq!(js_str(r#"button[aria-label="Edit"]"#), r#""button[aria-label=\"Edit\"]""#);
        assert_eq!(js_str("line\nbreak"), r#""line\nbreak""#);
    }

    #[test]
    fn test_locate_expr_embeds_text() {
        let js = locate_expr("button", Some("New notebook"));
        assert!(js.contains(r#"const text = "new notebook";"#));
        assert!(js.contains(r#"document.querySelectorAll("button")"#));

        let js = locate_expr("textarea", None);
        assert!(js.contains("const text = null;"));
    }
}
