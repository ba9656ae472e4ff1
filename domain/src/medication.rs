//! Managed medication classes and their standard peri-operative guidance.
//!
//! The catalogue backs both conflict detection (which items two roles can
//! disagree on) and the stoplight table expansion.

use crate::core::string::{contains_word, find_word};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A medication class the board manages explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MedicationClass {
    Sglt2i,
    Metformin,
    AceiArb,
    BetaBlocker,
    Statin,
    LoopDiuretic,
    Aspirin,
    Anticoagulant,
    Insulin,
    Sulfonylurea,
    Glp1Ra,
}

/// Standard row of the peri-operative stoplight table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoplightGuidance {
    pub continue_: &'static str,
    pub hold: &'static str,
    pub restart: &'static str,
    pub owner: &'static str,
}

impl MedicationClass {
    pub const ALL: [MedicationClass; 11] = [
        MedicationClass::Sglt2i,
        MedicationClass::Metformin,
        MedicationClass::AceiArb,
        MedicationClass::BetaBlocker,
        MedicationClass::Statin,
        MedicationClass::LoopDiuretic,
        MedicationClass::Aspirin,
        MedicationClass::Anticoagulant,
        MedicationClass::Insulin,
        MedicationClass::Sulfonylurea,
        MedicationClass::Glp1Ra,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            MedicationClass::Sglt2i => "sglt2i",
            MedicationClass::Metformin => "metformin",
            MedicationClass::AceiArb => "acei_arb",
            MedicationClass::BetaBlocker => "beta_blocker",
            MedicationClass::Statin => "statin",
            MedicationClass::LoopDiuretic => "loop_diuretic",
            MedicationClass::Aspirin => "aspirin",
            MedicationClass::Anticoagulant => "anticoagulant",
            MedicationClass::Insulin => "insulin",
            MedicationClass::Sulfonylurea => "sulfonylurea",
            MedicationClass::Glp1Ra => "glp1ra",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MedicationClass::Sglt2i => "SGLT2 inhibitor",
            MedicationClass::Metformin => "Metformin",
            MedicationClass::AceiArb => "ACE inhibitor / ARB",
            MedicationClass::BetaBlocker => "Beta-blocker",
            MedicationClass::Statin => "Statin",
            MedicationClass::LoopDiuretic => "Loop diuretic",
            MedicationClass::Aspirin => "Aspirin",
            MedicationClass::Anticoagulant => "Anticoagulant",
            MedicationClass::Insulin => "Insulin",
            MedicationClass::Sulfonylurea => "Sulfonylurea",
            MedicationClass::Glp1Ra => "GLP-1 RA",
        }
    }

    /// Words and drug names that identify the class in free text (lowercase)
    pub fn terms(&self) -> &'static [&'static str] {
        match self {
            MedicationClass::Sglt2i => &[
                "sglt2 inhibitor",
                "sglt2i",
                "sglt2",
                "sglt-2",
                "empagliflozin",
                "dapagliflozin",
                "canagliflozin",
                "ertugliflozin",
            ],
            MedicationClass::Metformin => &["metformin"],
            MedicationClass::AceiArb => &[
                "ace inhibitor",
                "acei",
                "arb",
                "arni",
                "lisinopril",
                "enalapril",
                "ramipril",
                "perindopril",
                "losartan",
                "valsartan",
                "candesartan",
                "irbesartan",
                "telmisartan",
                "sacubitril",
            ],
            MedicationClass::BetaBlocker => &[
                "beta-blocker",
                "beta blocker",
                "carvedilol",
                "metoprolol",
                "bisoprolol",
                "nebivolol",
            ],
            MedicationClass::Statin => &[
                "statin",
                "atorvastatin",
                "rosuvastatin",
                "simvastatin",
                "pravastatin",
            ],
            MedicationClass::LoopDiuretic => &[
                "loop diuretic",
                "furosemide",
                "torsemide",
                "bumetanide",
                "diuretic",
            ],
            MedicationClass::Aspirin => &["aspirin"],
            MedicationClass::Anticoagulant => &[
                "anticoagulant",
                "doac",
                "warfarin",
                "apixaban",
                "rivaroxaban",
                "dabigatran",
                "edoxaban",
            ],
            MedicationClass::Insulin => &["insulin", "glargine", "degludec", "lispro", "aspart"],
            MedicationClass::Sulfonylurea => &[
                "sulfonylurea",
                "glipizide",
                "glyburide",
                "glimepiride",
                "gliclazide",
            ],
            MedicationClass::Glp1Ra => &[
                "glp-1",
                "glp1",
                "semaglutide",
                "liraglutide",
                "dulaglutide",
                "tirzepatide",
                "exenatide",
            ],
        }
    }

    pub fn guidance(&self) -> StoplightGuidance {
        match self {
            MedicationClass::Sglt2i => StoplightGuidance {
                continue_: "",
                hold: "3-4 days pre-op",
                restart: "Eating and drinking normally, hemodynamically stable, no AKI",
                owner: "Endocrinology / Anesthesia",
            },
            MedicationClass::Metformin => StoplightGuidance {
                continue_: "",
                hold: "Day of surgery (48h post-op if contrast)",
                restart: "eGFR stable, no AKI, contrast risk resolved",
                owner: "Endocrinology",
            },
            MedicationClass::AceiArb => StoplightGuidance {
                continue_: "",
                hold: "24h pre-op",
                restart: "Hemodynamically stable, euvolemic, potassium acceptable",
                owner: "Nephrology / Anesthesia",
            },
            MedicationClass::BetaBlocker => StoplightGuidance {
                continue_: "Yes",
                hold: "",
                restart: "Continue peri-op; avoid abrupt withdrawal",
                owner: "Cardiology",
            },
            MedicationClass::Statin => StoplightGuidance {
                continue_: "Yes",
                hold: "",
                restart: "Continue peri-op",
                owner: "Cardiology",
            },
            MedicationClass::LoopDiuretic => StoplightGuidance {
                continue_: "Conditional",
                hold: "Day of surgery if hypovolemic or NPO",
                restart: "Based on volume status and renal function",
                owner: "Cardiology / Anesthesia",
            },
            MedicationClass::Aspirin => StoplightGuidance {
                continue_: "Conditional",
                hold: "Case-dependent",
                restart: "Once surgical hemostasis is secured",
                owner: "Surgery + Cardiology",
            },
            MedicationClass::Anticoagulant => StoplightGuidance {
                continue_: "",
                hold: "Per anticoagulation protocol (3-5 days pre-op)",
                restart: "Based on bleeding risk and indication",
                owner: "Hematology / Cardiology / Surgery",
            },
            MedicationClass::Insulin => StoplightGuidance {
                continue_: "Conditional",
                hold: "Short-acting: morning of surgery",
                restart: "Resume with meals; adjust to NPO status",
                owner: "Endocrinology",
            },
            MedicationClass::Sulfonylurea => StoplightGuidance {
                continue_: "",
                hold: "Day of surgery",
                restart: "Resume with meals to avoid hypoglycemia",
                owner: "Endocrinology",
            },
            MedicationClass::Glp1Ra => StoplightGuidance {
                continue_: "Conditional",
                hold: "Weekly formulations: 1 week pre-op (aspiration risk)",
                restart: "After return of normal GI function",
                owner: "Endocrinology / Anesthesia",
            },
        }
    }

    /// Whether `text` mentions this class
    pub fn is_mentioned_in(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.terms().iter().any(|term| contains_word(&lower, term))
    }

    /// First class mentioned in `text`, in catalogue order
    pub fn classify(text: &str) -> Option<MedicationClass> {
        let lower = text.to_lowercase();
        MedicationClass::ALL
            .into_iter()
            .find(|class| class.terms().iter().any(|t| contains_word(&lower, t)))
    }
}

impl std::fmt::Display for MedicationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for MedicationClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        MedicationClass::ALL
            .into_iter()
            .find(|c| c.key() == key)
            .or_else(|| MedicationClass::classify(&key))
            .ok_or_else(|| format!("unknown medication class '{}'", s))
    }
}

impl Serialize for MedicationClass {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for MedicationClass {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Action a role asserts for a managed medication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedAction {
    Continue,
    Hold,
    Stop,
    Start,
    Adjust,
}

impl MedAction {
    pub const ALL: [MedAction; 5] = [
        MedAction::Continue,
        MedAction::Hold,
        MedAction::Stop,
        MedAction::Start,
        MedAction::Adjust,
    ];

    pub fn verb(&self) -> &'static str {
        match self {
            MedAction::Continue => "Continue",
            MedAction::Hold => "Hold",
            MedAction::Stop => "Stop",
            MedAction::Start => "Start",
            MedAction::Adjust => "Adjust",
        }
    }

    fn words(&self) -> &'static [&'static str] {
        match self {
            MedAction::Continue => &["continue", "keep", "maintain"],
            MedAction::Hold => &["hold", "withhold", "pause", "omit", "suspend"],
            MedAction::Stop => &["stop", "discontinue", "avoid", "cease"],
            MedAction::Start => &["start", "initiate", "begin", "add", "resume", "restart"],
            MedAction::Adjust => &["reduce", "increase", "titrate", "adjust", "lower", "halve"],
        }
    }

    /// Earliest action verb in `text`
    pub fn detect(text: &str) -> Option<MedAction> {
        let lower = text.to_lowercase();
        MedAction::ALL
            .into_iter()
            .filter_map(|action| {
                action
                    .words()
                    .iter()
                    .filter_map(|w| find_word(&lower, w))
                    .min()
                    .map(|pos| (pos, action))
            })
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, action)| action)
    }
}

impl std::fmt::Display for MedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.verb())
    }
}

impl std::str::FromStr for MedAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MedAction::detect(s).ok_or_else(|| format!("unknown medication action '{}'", s))
    }
}
