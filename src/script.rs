//! Renders the Selenium automation script handed to the operator.
//!
//! Rendering is a single pass over the request with no I/O, so the same
//! request always yields byte-identical text. The emitted script is never
//! executed here.
//!
//! Layout of the output, in order:
//!
//! 1. a `#` comment header describing the toggles and watch time,
//! 2. navigation to the target URL,
//! 3. a fixed settle wait, then the watch wait,
//! 4. the like block, if enabled,
//! 5. the subscribe block, if enabled,
//! 6. the comment loop, if enabled,
//! 7. the finalization block.
//!
//! Every action block is wrapped in its own `try`/`except` so a failed lookup
//! is printed and the script moves on. The browser session is acquired with a
//! `with` statement and released when it exits.
//!
//! The element locators below are not checked against the live page and go
//! stale whenever the platform changes its markup.

use crate::models::{GeneratedScript, ScriptRequest};

/// Button labels that mean the channel is already subscribed, compared
/// against the lower-cased, trimmed button text.
pub const SUBSCRIBED_LABELS: &[&str] = &["subscribed", "đã đăng ký"];

pub const SETTLE_SECONDS: u64 = 5;
pub const SCROLL_SECONDS: u64 = 2;
pub const TYPE_SECONDS: u64 = 1;
pub const POST_SECONDS: u64 = 5;
pub const FINALIZE_SECONDS: u64 = 5;

const LIKE_XPATH: &str = "//like-button-view-model//button";
const SUBSCRIBE_XPATH: &str = "//ytd-subscribe-button-renderer//button";
const COMMENT_BOX_CSS: &str = "ytd-comment-simplebox-renderer";
const COMMENT_EDITABLE_CSS: &str = "#contenteditable-root";
const SUBMIT_CSS: &str = "ytd-button-renderer#submit-button button";

const MARKER_LIKE: &str = "# action: like";
const MARKER_SUBSCRIBE: &str = "# action: subscribe";
const MARKER_COMMENT: &str = "# action: comment";

/// Indent of statements inside the `with`/`try` body.
const BODY: &str = "        ";

/// Renders the automation script for `req`.
///
/// Input is not re-validated: a comment toggle with no comments renders a
/// comment block whose loop has zero iterations.
pub fn generate(req: &ScriptRequest) -> GeneratedScript {
    let mut out = String::with_capacity(2048);
    render_header(&mut out, req);
    render_preamble(&mut out, req);
    if req.enable_like {
        render_like(&mut out);
    }
    if req.enable_subscribe {
        render_subscribe(&mut out);
    }
    if req.enable_comment {
        render_comments(&mut out, req.comments.as_slice());
    }
    render_finalize(&mut out);
    GeneratedScript::new(out)
}

/// Escapes `text` for use inside a double-quoted Python string literal.
///
/// Backslash, quote and the ASCII control characters change; everything else,
/// including any non-ASCII text, is copied through untouched. Python rejects a
/// raw NUL in source, so controls without a short escape become `\xNN`.
pub fn escape_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            control if control.is_ascii_control() => {
                escaped.push_str(&format!("\\x{:02x}", u32::from(control)));
            }
            other => escaped.push(other),
        }
    }
    escaped
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", escape_literal(text))
}

fn python_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

fn line(out: &mut String, indent: &str, text: &str) {
    out.push_str(indent);
    out.push_str(text);
    out.push('\n');
}

fn render_header(out: &mut String, req: &ScriptRequest) {
    out.push_str("#!/usr/bin/env python3\n");
    out.push_str("# Auto-generated Selenium script. Run it locally, on a test account.\n");
    out.push_str("#\n");
    out.push_str("# Requirements:\n");
    out.push_str("#   pip install selenium\n");
    out.push_str("#   Chrome with a matching chromedriver on PATH\n");
    out.push_str("#   a browser profile that is already signed in\n");
    out.push_str("#\n");
    out.push_str("# Generated actions:\n");
    out.push_str("#   open video\n");
    out.push_str(&format!("#   wait {} seconds\n", req.watch_seconds));
    out.push_str(&format!("#   like: {}\n", python_bool(req.enable_like)));
    out.push_str(&format!(
        "#   comment: {} ({} comment(s))\n",
        python_bool(req.enable_comment),
        req.comments.len()
    ));
    out.push_str(&format!(
        "#   subscribe: {}\n",
        python_bool(req.enable_subscribe)
    ));
    out.push_str("#\n");
    out.push_str("# Automating likes, comments or subscriptions at scale may violate the\n");
    out.push_str("# platform's terms of service.\n");
    out.push('\n');
    out.push_str("import time\n");
    out.push('\n');
    out.push_str("from selenium import webdriver\n");
    out.push_str("from selenium.webdriver.chrome.options import Options\n");
    out.push_str("from selenium.webdriver.common.by import By\n");
    out.push('\n');
    out.push_str("options = Options()\n");
    out.push_str("# Keep the window visible so a manual sign-in is possible.\n");
    out.push_str("# options.add_argument(\"--headless=new\")\n");
    out.push_str("# Reuse a signed-in profile:\n");
    out.push_str("# options.add_argument(\"--user-data-dir=./profile\")\n");
    out.push('\n');
}

fn render_preamble(out: &mut String, req: &ScriptRequest) {
    out.push_str("with webdriver.Chrome(options=options) as driver:\n");
    out.push_str("    try:\n");
    line(out, BODY, &format!("driver.get({})", quoted(&req.target_url)));
    line(out, BODY, "print(\"Opened video, waiting for page load...\")");
    line(out, BODY, &format!("time.sleep({SETTLE_SECONDS})"));
    line(
        out,
        BODY,
        &format!("print(\"Watching for {} seconds...\")", req.watch_seconds),
    );
    line(out, BODY, &format!("time.sleep({})", req.watch_seconds));
}

fn render_like(out: &mut String) {
    out.push('\n');
    line(out, BODY, MARKER_LIKE);
    line(out, BODY, "try:");
    line(
        out,
        BODY,
        &format!("    like_btn = driver.find_element(By.XPATH, {})", quoted(LIKE_XPATH)),
    );
    line(out, BODY, "    like_btn.click()");
    line(out, BODY, "    print(\"Liked the video\")");
    line(out, BODY, "except Exception as e:");
    line(out, BODY, "    print(\"Like failed:\", e)");
}

fn render_subscribe(out: &mut String) {
    let labels = SUBSCRIBED_LABELS
        .iter()
        .map(|label| quoted(label))
        .collect::<Vec<_>>()
        .join(", ");

    out.push('\n');
    line(out, BODY, MARKER_SUBSCRIBE);
    line(out, BODY, "try:");
    line(
        out,
        BODY,
        &format!(
            "    sub_btn = driver.find_element(By.XPATH, {})",
            quoted(SUBSCRIBE_XPATH)
        ),
    );
    line(out, BODY, "    label = sub_btn.text.lower().strip()");
    line(out, BODY, &format!("    if label not in [{labels}]:"));
    line(out, BODY, "        sub_btn.click()");
    line(out, BODY, "        print(\"Subscribed\")");
    line(out, BODY, "    else:");
    line(out, BODY, "        print(\"Already subscribed\")");
    line(out, BODY, "except Exception as e:");
    line(out, BODY, "    print(\"Subscribe failed:\", e)");
}

fn render_comments(out: &mut String, comments: &[String]) {
    out.push('\n');
    line(out, BODY, MARKER_COMMENT);
    line(out, BODY, "try:");
    line(out, BODY, "    driver.execute_script(\"window.scrollTo(0, 1000)\")");
    line(out, BODY, &format!("    time.sleep({SCROLL_SECONDS})"));
    line(
        out,
        BODY,
        &format!(
            "    comment_box = driver.find_element(By.CSS_SELECTOR, {})",
            quoted(COMMENT_BOX_CSS)
        ),
    );
    line(out, BODY, "    comment_box.click()");
    line(out, BODY, &format!("    time.sleep({TYPE_SECONDS})"));
    line(
        out,
        BODY,
        &format!(
            "    editable = driver.find_element(By.CSS_SELECTOR, {})",
            quoted(COMMENT_EDITABLE_CSS)
        ),
    );
    line(out, BODY, "    for text in [");
    for comment in comments {
        line(out, BODY, &format!("        {},", quoted(comment)));
    }
    line(out, BODY, "    ]:");
    line(out, BODY, "        try:");
    line(out, BODY, "            editable.send_keys(text)");
    line(out, BODY, &format!("            time.sleep({TYPE_SECONDS})"));
    line(
        out,
        BODY,
        &format!(
            "            post_btn = driver.find_element(By.CSS_SELECTOR, {})",
            quoted(SUBMIT_CSS)
        ),
    );
    line(out, BODY, "            post_btn.click()");
    line(out, BODY, "            print(\"Posted comment:\", text[:60])");
    line(out, BODY, &format!("            time.sleep({POST_SECONDS})"));
    line(out, BODY, "        except Exception as e:");
    line(out, BODY, "            print(\"Posting comment failed for:\", text, e)");
    line(out, BODY, "except Exception as e:");
    line(out, BODY, "    print(\"Comment section failed:\", e)");
}

fn render_finalize(out: &mut String) {
    out.push('\n');
    out.push_str("    finally:\n");
    line(
        out,
        BODY,
        &format!("print(\"Done. Closing the browser in {FINALIZE_SECONDS} seconds...\")"),
    );
    line(out, BODY, &format!("time.sleep({FINALIZE_SECONDS})"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommentList;
    use proptest::prelude::*;

    fn request() -> ScriptRequest {
        ScriptRequest {
            target_url: "https://x/v=abc".to_string(),
            comments: CommentList::default(),
            watch_seconds: 180,
            enable_like: true,
            enable_comment: false,
            enable_subscribe: false,
        }
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    /// Every `"` that is not preceded by an escaping backslash opens or closes
    /// a literal, so a balanced line has an even number of them.
    fn unescaped_quotes(line: &str) -> usize {
        let mut total = 0;
        let mut escaped = false;
        for ch in line.chars() {
            match ch {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => total += 1,
                _ => escaped = false,
            }
            if ch != '\\' {
                escaped = false;
            }
        }
        total
    }

    #[test]
    fn like_only_request_has_one_guarded_block() {
        let text = generate(&request()).into_text();
        assert_eq!(count(&text, MARKER_LIKE), 1);
        assert_eq!(count(&text, MARKER_SUBSCRIBE), 0);
        assert_eq!(count(&text, MARKER_COMMENT), 0);
        assert_eq!(count(&text, "except Exception as e:"), 1);
        assert!(text.contains("time.sleep(180)"));
        assert!(text.contains("driver.get(\"https://x/v=abc\")"));
    }

    #[test]
    fn generation_is_deterministic() {
        let mut req = request();
        req.enable_comment = true;
        req.enable_subscribe = true;
        req.comments = CommentList::from_text("one\ntwo");
        assert_eq!(generate(&req), generate(&req));
        assert_eq!(generate(&req).text(), generate(&req.clone()).text());
    }

    #[test]
    fn quoted_comment_is_escaped_in_single_iteration() {
        let mut req = request();
        req.enable_like = false;
        req.enable_comment = true;
        req.comments = CommentList::from_rows([["hi \"there\""]]);
        let text = generate(&req).into_text();

        assert_eq!(count(&text, MARKER_COMMENT), 1);
        let entries: Vec<&str> = text
            .lines()
            .filter(|l| l.starts_with("                \""))
            .collect();
        assert_eq!(entries, ["                \"hi \\\"there\\\"\","]);
        for l in text.lines() {
            assert_eq!(unescaped_quotes(l) % 2, 0, "unbalanced line: {l}");
        }
    }

    #[test]
    fn hostile_comments_cannot_break_out_of_the_literal() {
        let mut req = request();
        req.enable_comment = true;
        req.comments = CommentList::from_rows([
            ["ends with backslash \\"],
            ["\\\"); driver.quit(); (\""],
            ["tab\there"],
        ]);
        let text = generate(&req).into_text();
        assert!(text.contains("\"ends with backslash \\\\\","));
        assert!(text.contains("\"\\\\\\\"); driver.quit(); (\\\"\","));
        assert!(text.contains("\"tab\\there\","));
        for l in text.lines() {
            assert_eq!(unescaped_quotes(l) % 2, 0, "unbalanced line: {l}");
        }
    }

    #[test]
    fn subscribe_block_branches_on_known_labels() {
        let mut req = request();
        req.enable_like = false;
        req.enable_subscribe = true;
        let text = generate(&req).into_text();

        assert!(text.contains("if label not in [\"subscribed\", \"đã đăng ký\"]:"));
        let activate = text.find("sub_btn.click()").unwrap();
        let skip = text.find("print(\"Already subscribed\")").unwrap();
        let branch = text.find("else:").unwrap();
        assert!(activate < branch && branch < skip);
        assert_eq!(count(&text, "except Exception as e:"), 1);
    }

    #[test]
    fn blocks_follow_fixed_order() {
        let mut req = request();
        req.enable_subscribe = true;
        req.enable_comment = true;
        req.comments = CommentList::from_text("a\nb\nc");
        let text = generate(&req).into_text();

        let nav = text.find("driver.get(").unwrap();
        let settle = text.find(&format!("time.sleep({SETTLE_SECONDS})")).unwrap();
        let watch = text.find("time.sleep(180)").unwrap();
        let like = text.find(MARKER_LIKE).unwrap();
        let sub = text.find(MARKER_SUBSCRIBE).unwrap();
        let comment = text.find(MARKER_COMMENT).unwrap();
        let fin = text.find("    finally:").unwrap();
        assert!(nav < settle && settle < watch);
        assert!(watch < like && like < sub && sub < comment && comment < fin);
        assert_eq!(count(&text, "editable.send_keys(text)"), 1);
        assert_eq!(count(&text, "\"a\",\n"), 1);
        assert_eq!(count(&text, "\"c\",\n"), 1);
        // like + subscribe + comment section + per-comment guard
        assert_eq!(count(&text, "except Exception as e:"), 4);
    }

    #[test]
    fn empty_comment_list_degrades_to_empty_loop() {
        let mut req = request();
        req.enable_like = false;
        req.enable_comment = true;
        let text = generate(&req).into_text();
        assert_eq!(count(&text, MARKER_COMMENT), 1);
        assert!(text.contains("            for text in [\n            ]:\n"));
    }

    #[test]
    fn unicode_is_copied_byte_for_byte() {
        let mut req = request();
        req.enable_comment = true;
        let comment = "Video hay quá 👍 cảm ơn nhé";
        req.comments = CommentList::from_rows([[comment]]);
        let text = generate(&req).into_text();
        assert!(text.contains(&format!("\"{comment}\",")));
        assert_eq!(escape_literal(comment), comment);
    }

    #[test]
    fn header_describes_toggles_and_session_is_scoped() {
        let mut req = request();
        req.watch_seconds = 42;
        let text = generate(&req).into_text();
        assert!(text.starts_with("#!/usr/bin/env python3\n"));
        assert!(text.contains("#   wait 42 seconds\n"));
        assert!(text.contains("#   like: True\n"));
        assert!(text.contains("#   comment: False (0 comment(s))\n"));
        assert!(text.contains("#   subscribe: False\n"));
        assert!(text.contains("with webdriver.Chrome(options=options) as driver:\n"));
        assert!(!text.contains("driver.quit()"));
        assert!(text.ends_with(&format!("time.sleep({FINALIZE_SECONDS})\n")));
    }

    #[test]
    fn target_url_is_escaped_too() {
        let mut req = request();
        req.target_url = "https://x/v=\"abc".to_string();
        let text = generate(&req).into_text();
        assert!(text.contains("driver.get(\"https://x/v=\\\"abc\")"));
    }

    #[test]
    fn control_characters_become_hex_escapes() {
        assert_eq!(
            escape_literal("a\0b\x0bc\x1bd\x7f"),
            "a\\x00b\\x0bc\\x1bd\\x7f"
        );
        let mut req = request();
        req.enable_comment = true;
        req.comments = CommentList::from_text("nul\0here\nform\x0cfeed");
        let text = generate(&req).into_text();
        assert!(!text.chars().any(|c| c.is_ascii_control() && c != '\n'));
        assert!(text.contains("\"nul\\x00here\""));
        assert!(text.contains("\"form\\x0cfeed\""));
    }

    /// Reads a literal body back the way Python would for the escapes used here.
    fn unescape(body: &str) -> String {
        let mut out = String::new();
        let mut chars = body.chars();
        while let Some(ch) = chars.next() {
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('x') => {
                    let hex: String = chars.by_ref().take(2).collect();
                    let code = u32::from_str_radix(&hex, 16).unwrap();
                    out.push(char::from_u32(code).unwrap());
                }
                Some(other) => out.push(other),
                None => panic!("dangling backslash in {body:?}"),
            }
        }
        out
    }

    proptest! {
        #[test]
        fn prop_any_text_stays_inside_one_literal(text in any::<String>()) {
            let literal = quoted(&text);
            prop_assert_eq!(unescaped_quotes(&literal), 2);
            prop_assert!(!literal.chars().any(|c| c.is_ascii_control()));
            prop_assert_eq!(unescape(&literal[1..literal.len() - 1]), text);
        }

        #[test]
        fn prop_generated_lines_balance_their_quotes(
            lines in proptest::collection::vec("[\\PC\"\\\\]{1,12}", 1..5),
            like in any::<bool>(),
            subscribe in any::<bool>(),
        ) {
            let mut req = request();
            req.enable_like = like;
            req.enable_subscribe = subscribe;
            req.enable_comment = true;
            req.comments = CommentList::from_text(&lines.join("\n"));
            let first = generate(&req).into_text();
            let second = generate(&req);
            prop_assert_eq!(&first, second.text());
            for line in first.lines() {
                prop_assert_eq!(unescaped_quotes(line) % 2, 0, "{}", line);
            }
        }
    }
}
