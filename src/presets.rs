//! Persona presets and the model catalog

use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "moonshotai/kimi-k2:free";

const PREAMBLE: &str = "You are ASTRA-X, an advanced AI system";

/// Named assistant personas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Persona
{   /// Mission-control chat companion
    #[default]
    MissionAssistant
  , /// Planetary and exploration science analyst
    ScientificAnalysis
}

impl Persona
{   pub const ALL: [Persona; 2]
      = [Persona::MissionAssistant, Persona::ScientificAnalysis];

    pub fn id(&self) -> &'static str
    {   match self
        {   Persona::MissionAssistant => "mission-assistant"
          , Persona::ScientificAnalysis => "scientific-analysis"
        }
    }

    pub fn from_id(id: &str) -> Option<Persona>
    {   Persona::ALL.into_iter().find(|p| p.id() == id)
    }

    fn template(&self) -> PersonaTemplate
    {   match self
        {   Persona::MissionAssistant => PersonaTemplate
            {   focus: "for space exploration and mission control"
              , expertise: &[
                  "Planetary analysis and terrain assessment"
                , "Orbital mechanics and trajectory calculations"
                , "Space navigation and hazard detection"
                , "Mission planning and resource management"
                , "Spacecraft systems and diagnostics"
                , "Astrobiology and exoplanet research"
                ]
              , tone: "Respond in a professional yet engaging manner, \
                  as if you're part of a real space mission control team. \
                  Use space exploration terminology appropriately."
            }
          , Persona::ScientificAnalysis => PersonaTemplate
            {   focus: "designed for trans-planetary exploration and \
                  space mission analysis"
              , expertise: &[
                  "Planetary geology and atmospheric science"
                , "Space navigation and orbital mechanics"
                , "Astrobiology and life detection"
                , "Resource extraction and utilization"
                , "Mission planning and risk assessment"
                ]
              , tone: "Respond as an intelligent, precise space \
                  exploration AI with technical expertise. \
                  Use scientific terminology when appropriate."
            }
        }
    }

    /// Rendered preset for this persona
    pub fn preset(&self) -> PersonaPreset
    {   PersonaPreset
        {   id: *self
          , system_prompt: self.template().render()
          , default_model: DEFAULT_MODEL.to_string()
        }
    }
}

/// Shared system-prompt shape; personas differ only in parameters
struct PersonaTemplate
{   focus: &'static str
  , expertise: &'static [&'static str]
  , tone: &'static str
}

impl PersonaTemplate
{   fn render(&self) -> String
    {   let mut out = format!(
          "{} {}. You have deep knowledge of:\n",
          PREAMBLE, self.focus
        );
        for item in self.expertise
        {   out.push_str("- ");
            out.push_str(item);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(self.tone);
        out.push_str(" Keep responses concise but informative.");
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaPreset
{   pub id: Persona
  , pub system_prompt: String
  , pub default_model: String
}

/// Information about a selectable model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo
{   pub id: String
  , pub name: String
  , pub description: String
  , /// Maximum context window (in tokens)
    pub context_length: usize
  , /// Price per prompt token, as quoted by the provider
    pub prompt_price: String
  , pub completion_price: String
}

/// Models offered in the dashboard's model picker
pub fn available_models() -> Vec<ModelInfo>
{   vec![
      ModelInfo
      {   id: DEFAULT_MODEL.to_string()
        , name: "Kimi K2".to_string()
        , description: "Advanced AI for space exploration analysis"
            .to_string()
        , context_length: 32_000
        , prompt_price: "0".to_string()
        , completion_price: "0".to_string()
      }
    , ModelInfo
      {   id: "meta-llama/llama-3.1-8b-instruct:free".to_string()
        , name: "LLaMA 3.1 8B".to_string()
        , description: "Fast and efficient for general tasks".to_string()
        , context_length: 128_000
        , prompt_price: "0".to_string()
        , completion_price: "0".to_string()
      }
    ]
}
