//! Selector configuration per tax-process variant.
//!
//! Locators are data, not code paths: one profile per variant, built once and
//! read-only for the lifetime of a run. Controls that share a locator with
//! other controls carry the visible-text label that disambiguates them.

use darweb_core_types::ProcessKind;
use serde::{Deserialize, Serialize};

/// Shared controls across all variants.
const MENU_LINK_SCOPE: &str = "a.portalPanelLink";
const MENU_LINK_LABEL: &str = "ICMS";
const CODE_SELECT: &str = "select[name=\"j_idt43\"]";
const BUTTON_SCOPE: &str = "span.ui-button-text";
const ADVANCE_LABEL: &str = "Avançar";
const CALCULATE_LABEL: &str = "Calcular Imposto";
const CONFIRM_LABEL: &str = "Emitir DAR";

/// A locator whose scope matches several controls plus the visible-text label
/// that singles out the intended one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Disambiguated {
    pub locator: String,
    pub label: String,
}

impl Disambiguated {
    fn new(locator: &str, label: &str) -> Self {
        Self {
            locator: locator.to_string(),
            label: label.to_string(),
        }
    }
}

/// Named locator table for one tax-process variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectorProfile {
    pub process: ProcessKind,
    pub version: u16,

    /// Portal menu entry opening the DAR flow.
    pub menu_link: Disambiguated,
    /// Revenue-code dropdown and the option it must land on.
    pub code_select: String,
    pub code_option_label: String,

    /// State registration (IE) input.
    pub ie_field: String,
    /// Tax-substitution dropdown with its fixed answer; `None` for variants
    /// whose identifier page has no such control.
    pub substitution: Option<Disambiguated>,

    /// General-case form (formCasoGeral) fields.
    pub period_field: String,
    pub due_date_field: String,
    pub payment_date_field: String,
    pub principal_value_field: String,

    /// All action buttons share this scope and differ only by label.
    pub button_scope: String,
    pub advance_label: String,
    pub calculate_label: String,
    pub confirm_label: String,
}

impl SelectorProfile {
    pub fn for_process(process: ProcessKind) -> Self {
        match process {
            ProcessKind::AntecipacaoParcial => Self::antecipacao_parcial(),
            ProcessKind::Normal => Self::normal(),
            ProcessKind::Difal => Self::difal(),
        }
    }

    /// ICMS Antecipação Parcial (113011). The only variant with its own
    /// identifier page layout and no substitution dropdown.
    pub fn antecipacao_parcial() -> Self {
        Self {
            process: ProcessKind::AntecipacaoParcial,
            version: 1,
            menu_link: Disambiguated::new(MENU_LINK_SCOPE, MENU_LINK_LABEL),
            code_select: CODE_SELECT.to_string(),
            code_option_label: "113011 - ICMS – ANTECIPAÇÃO PARCIAL".to_string(),
            ie_field: "#j_idt45".to_string(),
            substitution: None,
            period_field: "[id=\"formCasoGeral:fieldPeriodo\"]".to_string(),
            due_date_field: "[id=\"formCasoGeral:j_idt64:calendar_input\"]".to_string(),
            payment_date_field: "[id=\"formCasoGeral:j_idt68:calendar_input\"]".to_string(),
            principal_value_field: "[id=\"formCasoGeral:j_idt70:input\"]".to_string(),
            button_scope: BUTTON_SCOPE.to_string(),
            advance_label: ADVANCE_LABEL.to_string(),
            calculate_label: CALCULATE_LABEL.to_string(),
            confirm_label: CONFIRM_LABEL.to_string(),
        }
    }

    /// ICMS Apuração Normal (113000).
    pub fn normal() -> Self {
        Self::general_case(ProcessKind::Normal, "113000 - ICMS - APURAÇÃO NORMAL")
    }

    /// ICMS DIFAL — imposto, juros e multa (113001).
    pub fn difal() -> Self {
        Self::general_case(ProcessKind::Difal, "113001 - ICMS - IMPOSTO, JUROS E MULTA")
    }

    /// Normal and DIFAL share the general-case form; only the revenue code
    /// option differs.
    fn general_case(process: ProcessKind, code_option_label: &str) -> Self {
        Self {
            process,
            version: 1,
            menu_link: Disambiguated::new(MENU_LINK_SCOPE, MENU_LINK_LABEL),
            code_select: CODE_SELECT.to_string(),
            code_option_label: code_option_label.to_string(),
            ie_field: "#fieldInscricaoEstadual".to_string(),
            substitution: Some(Disambiguated::new("#cmbSubstituicao", "NÃO")),
            period_field: "[id=\"formCasoGeral:j_idt67\"]".to_string(),
            due_date_field: "[id=\"formCasoGeral:j_idt70:calendar_input\"]".to_string(),
            payment_date_field: "[id=\"formCasoGeral:j_idt75:calendar_input\"]".to_string(),
            principal_value_field: "[id=\"formCasoGeral:j_idt78:input\"]".to_string(),
            button_scope: BUTTON_SCOPE.to_string(),
            advance_label: ADVANCE_LABEL.to_string(),
            calculate_label: CALCULATE_LABEL.to_string(),
            confirm_label: CONFIRM_LABEL.to_string(),
        }
    }

    pub fn has_substitution(&self) -> bool {
        self.substitution.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn antecipacao_parcial_has_no_substitution() {
        let profile = SelectorProfile::antecipacao_parcial();
        assert!(!profile.has_substitution());
        assert_eq!(profile.ie_field, "#j_idt45");
        assert!(profile.code_option_label.starts_with("113011"));
    }

    #[test]
    fn normal_and_difal_share_the_general_case_form() {
        let normal = SelectorProfile::normal();
        let difal = SelectorProfile::difal();

        for profile in [&normal, &difal] {
            assert!(profile.has_substitution());
            assert_eq!(profile.ie_field, "#fieldInscricaoEstadual");
            assert_eq!(
                profile.substitution.as_ref().unwrap().label,
                "NÃO",
                "substitution answer is fixed"
            );
        }
        assert!(normal.code_option_label.starts_with("113000"));
        assert!(difal.code_option_label.starts_with("113001"));
        assert_ne!(normal.code_option_label, difal.code_option_label);
    }

    #[test]
    fn every_variant_disambiguates_buttons_by_label() {
        for process in [
            ProcessKind::AntecipacaoParcial,
            ProcessKind::Normal,
            ProcessKind::Difal,
        ] {
            let profile = SelectorProfile::for_process(process);
            assert_eq!(profile.process, process);
            assert_eq!(profile.button_scope, "span.ui-button-text");
            assert_ne!(profile.advance_label, profile.calculate_label);
            assert_ne!(profile.calculate_label, profile.confirm_label);
        }
    }
}
