//! HTML generation utilities for testing.
//!
//! Builds portal home pages in both contract menu layouts.

/// Renders a home page listing contracts in the current accordion layout.
pub fn current_layout_page(contracts: &[(&str, &str)]) -> String {
    let mut anchors = String::new();
    for (label, token) in contracts {
        anchors.push_str(&format!(
            r#"<a class="context-menu-entry" href="/powercommerce/tinetz/fo/portal/dataContextUpdate?key={}" title="{}">Vertragskonto {}</a>"#,
            token, label, label
        ));
        anchors.push('\n');
    }

    format!(
        r#"<html><body>
            <nav class="navbar"><a href="home">Startseite</a></nav>
            <div class="accordion">
                <div class="accordion-header">Vertragskonten</div>
                <div class="accordion-body">
                    {}
                </div>
            </div>
        </body></html>"#,
        anchors
    )
}

/// Renders a home page listing contracts in the legacy collapse menu.
pub fn legacy_layout_page(contracts: &[(&str, &str)]) -> String {
    let mut anchors = String::new();
    for (label, token) in contracts {
        anchors.push_str(&format!(
            r#"<li><a href="dataContextUpdate?key={}" title="{}">{}</a></li>"#,
            token, label, label
        ));
        anchors.push('\n');
    }

    format!(
        r#"<html><body>
            <div id="contractAccountCollapseMenu" class="collapse">
                <ul>{}</ul>
            </div>
        </body></html>"#,
        anchors
    )
}

/// Renders a home page of a single-contract account, which has no menu.
pub fn single_contract_page() -> String {
    r#"<html><body>
        <div class="content"><h1>Willkommen</h1><p>Vertragskonto 1000</p></div>
    </body></html>"#
        .to_string()
}
