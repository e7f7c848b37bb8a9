//! 文件名清洗
//!
//! - `sanitize_filename`: 只保留字母数字、`-`、`_`，用于每个笔记本的输出目录
//! - `sanitize_label`: 只替换路径非法字符，保留空格，用于书籍目录和章节文件名

/// 清洗结果为空时使用的占位名
pub const UNTITLED: &str = "untitled";

const LABEL_MAX_CHARS: usize = 120;

/// 把标题转换为安全的文件名（不含扩展名）
pub fn sanitize_filename(title: &str) -> String {
    let replaced: String = title
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let name = collapse_underscores(&replaced);
    let name = name.trim_matches('_');
    if name.is_empty() {
        UNTITLED.to_string()
    } else {
        name.to_string()
    }
}

/// 替换路径非法字符，并截断到 120 个字符
pub fn sanitize_label(label: &str) -> String {
    let replaced: String = label
        .chars()
        .map(|c| {
            if matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let name = collapse_underscores(&replaced);
    let name = name.trim_matches(|c: char| c == '_' || c == '.' || c == ' ');
    let name: String = name.chars().take(LABEL_MAX_CHARS).collect();
    if name.is_empty() {
        UNTITLED.to_string()
    } else {
        name
    }
}

fn collapse_underscores(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        if c == '_' {
            if !prev_underscore {
                out.push(c);
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    #[test]
    fn test_sanitize_filename_basic() {
        assert_eq!(sanitize_filename("Report: A"), "Report_A");
        assert_eq!(sanitize_filename("Report/A"), "Report_A");
        assert_eq!(sanitize_filename("  Rust — Ownership & Borrowing  "), "Rust_Ownership_Borrowing");
        assert_eq!(sanitize_filename("already_safe-name"), "already_safe-name");
    }

    #[test]
    fn test_sanitize_filename_fallback() {
        assert_eq!(sanitize_filename(""), UNTITLED);
        assert_eq!(sanitize_filename("   "), UNTITLED);
        assert_eq!(sanitize_filename("///???"), UNTITLED);
    }

    #[test]
    fn test_sanitize_filename_never_contains_forbidden_chars() {
        let titles = [
            "a<b>c",
            "C:\\Windows\\system32",
            "what?*|\"quoted\"",
            "tab\tnew\nline",
            "__lead__and__trail__",
            "中文 标题：测试",
        ];
        for title in titles {
            let safe = sanitize_filename(title);
            assert!(!safe.is_empty());
            assert!(!safe.contains(FORBIDDEN), "{title} -> {safe}");
            assert!(!safe.contains("__"), "{title} -> {safe}");
            assert!(!safe.starts_with('_') && !safe.ends_with('_'), "{title} -> {safe}");
            assert!(!safe.contains(char::is_whitespace));
        }
    }

    #[test]
    fn test_sanitize_filename_keeps_unicode_letters() {
        assert_eq!(sanitize_filename("中文 标题"), "中文_标题");
    }

    #[test]
    fn test_sanitize_label_keeps_spaces() {
        assert_eq!(sanitize_label("Expert Python Programming"), "Expert Python Programming");
        assert_eq!(
            sanitize_label("Automating DevOps with GitLab CI/CD Pipelines"),
            "Automating DevOps with GitLab CI_CD Pipelines"
        );
        assert_eq!(sanitize_label("Solutions Architect's Handbook"), "Solutions Architect's Handbook");
    }

    #[test]
    fn test_sanitize_label_trims_and_truncates() {
        assert_eq!(sanitize_label("  .hidden name. "), "hidden name");
        assert_eq!(sanitize_label("a::b"), "a_b");
        assert_eq!(sanitize_label("..."), UNTITLED);

        let long = "x".repeat(300);
        assert_eq!(sanitize_label(&long).chars().count(), 120);
    }
}
