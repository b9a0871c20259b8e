use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

pub type PlayerId = u32;
pub type DotId = u32;

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "InitPlayer")]
    InitPlayer(InitPlayerMsg),
    #[serde(rename = "InitPlayers")]
    InitPlayers(PlayersMsg),
    #[serde(rename = "InitDots")]
    InitDots(DotsMsg),
    #[serde(rename = "UpdatePlayers")]
    UpdatePlayers(PlayersMsg),
    #[serde(rename = "UpdateDots")]
    UpdateDots(DotsMsg),
    #[serde(rename = "Eliminated")]
    Eliminated(EliminatedMsg),
    #[serde(rename = "ResetRound")]
    ResetRound(ResetRoundMsg),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InitPlayerMsg {
    pub player: PlayerWire,
}

/// Full roster keyed by player id
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlayersMsg {
    pub players: BTreeMap<PlayerId, PlayerWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DotsMsg {
    pub dots: Vec<DotWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EliminatedMsg {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ResetRoundMsg {
    pub status: String,
}

impl Default for ResetRoundMsg {
    fn default() -> Self {
        Self {
            status: "Reset".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlayerWire {
    pub id: PlayerId,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub speed: i32,
    pub radius: i32,
    pub colour: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DotWire {
    pub id: DotId,
    pub colour: String,
    pub radius: i32,
    pub x: i32,
    pub y: i32,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "input")]
    Input(MovementInput),
    #[serde(rename = "InitConfig")]
    InitConfig(PlayerConfigMsg),
    #[serde(rename = "Reset")]
    Reset(PlayerConfigMsg),
}

/// Directional keys held by a player. Bots produce the same payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MovementInput {
    pub id: PlayerId,
    pub w: bool,
    pub a: bool,
    pub s: bool,
    pub d: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlayerConfigMsg {
    pub name: String,
    pub colour: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire_player(id: PlayerId) -> PlayerWire {
        PlayerWire {
            id,
            name: "Alex".to_string(),
            x: 3000,
            y: 2997,
            speed: 3,
            radius: 24,
            colour: "#FF1744".to_string(),
        }
    }

    #[test]
    fn update_players_is_keyed_by_id() {
        let mut players = BTreeMap::new();
        players.insert(7, wire_player(7));
        let msg = ServerMsg::UpdatePlayers(PlayersMsg { players });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"UpdatePlayers\""));
        assert!(json.contains("\"7\":{"));
        let parsed: ServerMsg = serde_json::from_str(&json).unwrap();
        match parsed {
            ServerMsg::UpdatePlayers(p) => assert_eq!(p.players[&7], wire_player(7)),
            _ => panic!("Expected UpdatePlayers"),
        }
    }

    #[test]
    fn eliminated_uses_camel_case_player_id() {
        let msg = ServerMsg::Eliminated(EliminatedMsg { player_id: 12 });
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"Eliminated","playerId":12}"#);
    }

    #[test]
    fn reset_round_defaults_to_reset_status() {
        let msg = ServerMsg::ResetRound(ResetRoundMsg::default());
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"ResetRound","status":"Reset"}"#);
    }

    #[test]
    fn dots_carry_wire_fields() {
        let msg = ServerMsg::InitDots(DotsMsg {
            dots: vec![DotWire {
                id: 3,
                colour: "#39FF14".to_string(),
                radius: 8,
                x: 10,
                y: 20,
            }],
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"InitDots\""));
        assert!(json.contains("\"dots\":[{\"id\":3"));
    }

    #[test]
    fn client_input_parses_from_browser_payload() {
        let json = r#"{"type":"input","id":4,"w":true,"a":false,"s":false,"d":true}"#;
        let parsed: ClientMsg = serde_json::from_str(json).unwrap();
        match parsed {
            ClientMsg::Input(input) => {
                assert_eq!(input.id, 4);
                assert!(input.w && input.d);
                assert!(!input.a && !input.s);
            }
            _ => panic!("Expected Input"),
        }
    }

    #[test]
    fn client_config_and_reset_share_payload() {
        let config: ClientMsg =
            serde_json::from_str(r##"{"type":"InitConfig","name":"Alex","colour":"#FF1744"}"##)
                .unwrap();
        assert!(matches!(config, ClientMsg::InitConfig(ref c) if c.name == "Alex"));

        let reset: ClientMsg =
            serde_json::from_str(r##"{"type":"Reset","name":"","colour":"#FF1744"}"##).unwrap();
        assert!(matches!(reset, ClientMsg::Reset(ref c) if c.name.is_empty()));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result = serde_json::from_str::<ClientMsg>(r#"{"type":"teleport","x":1}"#);
        assert!(result.is_err());
    }
}
